// ── URL rule reconciliation ──
//
// Drives the modem's URL-filter table toward a desired state. Every decision
// is made against a fresh read of the table; nothing is cached across
// attempts because a previous write may have half-applied.
//
// Attempt caps are hard: whichever path a failure takes, an ensure or a
// removal never runs more than `max_retries` attempts.

use std::collections::BTreeSet;
use std::time::Duration;

use c4000_api::SessionClient;
use serde::Serialize;
use strum::Display;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::model::rule::parse_rules;
use crate::model::{DesiredRuleSpec, Rule};
use crate::resolver::{DeviceResolver, Resolution};

/// Attempts per rule target, and per removal.
pub const MAX_RETRIES: u32 = 3;

/// Rule table object path.
pub const URL_FILTER_OBJECT: &str = "Device.Firewall.X_LANTIQ_COM_URLFilter";
const RULE_OBJECT: &str = "Device.Firewall.X_LANTIQ_COM_URLFilter.Rule";

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    pub max_retries: u32,
    /// Extra pause after a device error, on top of the transport's own backoff.
    pub error_backoff: Duration,
    /// Courtesy pause between successful deletions in `remove_all`.
    pub removal_pause: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            error_backoff: Duration::from_secs(2),
            removal_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    Present,
    Absent,
}

impl DesiredState {
    pub fn action(self) -> &'static str {
        match self {
            Self::Present => "ADD",
            Self::Absent => "REMOVE",
        }
    }
}

/// How a single ensure converged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnsureOutcome {
    /// Found exactly once on the first read; nothing written.
    AlreadyPresent,
    /// Created, then seen exactly once on a later read.
    VerifiedPresent { attempts: u32 },
    /// Duplicates were found and every copy but the first targeted for
    /// deletion. `stuck` lists copies the modem refused to delete.
    DuplicatesRemoved { removed: usize, stuck: Vec<String> },
    AlreadyAbsent,
    VerifiedAbsent { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// The id was not in the table when first checked.
    AlreadyGone,
    Removed,
}

/// Result for one requested `(device, domain)` pair in a batch.
#[derive(Debug)]
pub struct RuleResult {
    pub spec: DesiredRuleSpec,
    pub desired: DesiredState,
    /// `None` when the device identifier did not resolve.
    pub mac: Option<String>,
    pub outcome: Result<EnsureOutcome, CoreError>,
}

impl RuleResult {
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Err(CoreError::ResolutionNotFound { .. }))
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<RuleResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_err() && !r.is_skipped())
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_ok())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveAllReport {
    pub removed: usize,
    pub stuck: BTreeSet<String>,
}

pub struct RuleReconciler<'a> {
    session: &'a SessionClient,
    resolver: DeviceResolver<'a>,
    config: ReconcilerConfig,
}

impl<'a> RuleReconciler<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self::with_config(session, ReconcilerConfig::default())
    }

    pub fn with_config(session: &'a SessionClient, config: ReconcilerConfig) -> Self {
        Self {
            session,
            resolver: DeviceResolver::new(session),
            config,
        }
    }

    pub fn resolver(&self) -> &DeviceResolver<'a> {
        &self.resolver
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Raw URL-filter JSON, for debug dumps.
    pub async fn fetch_rules_raw(&self) -> Result<serde_json::Value, CoreError> {
        Ok(self.session.fetch_object(URL_FILTER_OBJECT).await?)
    }

    /// Current rule table, in modem order.
    pub async fn rules(&self) -> Result<Vec<Rule>, CoreError> {
        let response = self.session.fetch_objects(URL_FILTER_OBJECT).await?;
        let rules = parse_rules(&response);
        debug!(count = rules.len(), "fetched URL filter rules");
        Ok(rules)
    }

    async fn matching(&self, domain: &str, mac: &str) -> Result<Vec<Rule>, CoreError> {
        let mut rules = self.rules().await?;
        rules.retain(|r| r.matches(domain, mac));
        Ok(rules)
    }

    // ── Writes ───────────────────────────────────────────────────────

    async fn create(&self, domain: &str, mac: &str) -> Result<(), CoreError> {
        let url = format!("http://{domain}");
        info!("adding rule for '{domain}' ({})", describe_target(mac));
        self.session
            .apply_change(&[
                ("Object", RULE_OBJECT),
                ("Operation", "Add"),
                ("URL", url.as_str()),
                ("MACAddress", mac),
            ])
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let object = format!("{RULE_OBJECT}.{id}.");
        debug!("deleting rule #{id}");
        self.session
            .apply_change(&[("Object", object.as_str()), ("Operation", "Del")])
            .await?;
        Ok(())
    }

    // ── Single target ────────────────────────────────────────────────

    /// Converge `(domain, mac)` to `desired`.
    ///
    /// Device errors inside an attempt are logged and cost that attempt;
    /// any other error is returned immediately. Running out of attempts is
    /// `CoreError::ReconciliationExhausted`.
    pub async fn ensure_rule(
        &self,
        domain: &str,
        mac: &str,
        desired: DesiredState,
    ) -> Result<EnsureOutcome, CoreError> {
        let max = self.config.max_retries;
        for attempt in 1..=max {
            debug!("ensuring '{domain}' is {desired} (attempt {attempt}/{max})");
            match self.ensure_attempt(domain, mac, desired, attempt).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) if e.is_device_error() => {
                    warn!("modem error on attempt {attempt}/{max} for '{domain}': {e}");
                    sleep(self.config.error_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }

        let err = CoreError::ReconciliationExhausted {
            action: desired.action().to_owned(),
            domain: domain.to_owned(),
            target: describe_target(mac),
            attempts: max,
        };
        error!("{err}");
        Err(err)
    }

    /// One read-decide-act pass. `Ok(None)` means "look again".
    async fn ensure_attempt(
        &self,
        domain: &str,
        mac: &str,
        desired: DesiredState,
        attempt: u32,
    ) -> Result<Option<EnsureOutcome>, CoreError> {
        let matches = self.matching(domain, mac).await?;

        match (desired, matches.as_slice()) {
            (DesiredState::Present, []) => {
                self.create(domain, mac).await?;
                Ok(None)
            }
            (DesiredState::Present, [_]) => Ok(Some(if attempt == 1 {
                info!("rule for '{domain}' already exists");
                EnsureOutcome::AlreadyPresent
            } else {
                info!("rule for '{domain}' verified present after retry");
                EnsureOutcome::VerifiedPresent { attempts: attempt }
            })),
            (DesiredState::Present, [keep, extra @ ..]) => {
                warn!(
                    "found {} duplicates of '{domain}', keeping rule #{}",
                    extra.len(),
                    keep.id
                );
                let mut removed = 0;
                let mut stuck = Vec::new();
                for duplicate in extra {
                    match self.remove_by_id(&duplicate.id).await {
                        Ok(_) => removed += 1,
                        Err(e) => {
                            warn!("duplicate rule #{} could not be removed: {e}", duplicate.id);
                            stuck.push(duplicate.id.clone());
                        }
                    }
                }
                Ok(Some(EnsureOutcome::DuplicatesRemoved { removed, stuck }))
            }
            (DesiredState::Absent, []) => Ok(Some(if attempt == 1 {
                info!("rule for '{domain}' does not exist");
                EnsureOutcome::AlreadyAbsent
            } else {
                info!("rule for '{domain}' verified removed");
                EnsureOutcome::VerifiedAbsent { attempts: attempt }
            })),
            (DesiredState::Absent, [first, ..]) => {
                info!("removing rule #{} for '{domain}'", first.id);
                self.delete(&first.id).await?;
                Ok(None)
            }
        }
    }

    // ── Batches ──────────────────────────────────────────────────────

    pub async fn ensure_rules_present(
        &self,
        specs: &[DesiredRuleSpec],
    ) -> Result<BatchReport, CoreError> {
        self.ensure_rules(specs, DesiredState::Present).await
    }

    pub async fn ensure_rules_absent(
        &self,
        specs: &[DesiredRuleSpec],
    ) -> Result<BatchReport, CoreError> {
        self.ensure_rules(specs, DesiredState::Absent).await
    }

    /// Resolve every identifier up front, then reconcile each pair in order.
    ///
    /// Only a failed host-table read aborts the batch. Unresolved identifiers
    /// and exhausted targets are recorded and processing moves on.
    async fn ensure_rules(
        &self,
        specs: &[DesiredRuleSpec],
        desired: DesiredState,
    ) -> Result<BatchReport, CoreError> {
        let resolved = self
            .resolver
            .resolve_many(specs.iter().map(|s| s.device.as_str()))
            .await?;

        let mut report = BatchReport::default();
        for spec in specs {
            let resolution = resolved
                .get(&spec.device)
                .cloned()
                .unwrap_or(Resolution::NotFound);
            let result = match resolution {
                Resolution::NotFound => {
                    warn!("skipping '{}': device '{}' not found", spec.domain, spec.device);
                    RuleResult {
                        spec: spec.clone(),
                        desired,
                        mac: None,
                        outcome: Err(CoreError::ResolutionNotFound {
                            identifier: spec.device.clone(),
                        }),
                    }
                }
                Resolution::Found(mac) => {
                    let outcome = self.ensure_rule(&spec.domain, &mac, desired).await;
                    RuleResult {
                        spec: spec.clone(),
                        desired,
                        mac: Some(mac),
                        outcome,
                    }
                }
            };
            report.results.push(result);
        }
        Ok(report)
    }

    // ── Removal by id ────────────────────────────────────────────────

    /// Delete rule `id` and confirm it is gone.
    ///
    /// Each attempt re-reads the table first, so an id that disappeared on
    /// its own (or after an earlier delete finally committed) is success.
    pub async fn remove_by_id(&self, id: &str) -> Result<RemovalOutcome, CoreError> {
        let max = self.config.max_retries;
        for attempt in 1..=max {
            match self.remove_attempt(id, attempt).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(e) if e.is_device_error() => {
                    warn!("modem error removing rule #{id} (attempt {attempt}/{max}): {e}");
                    sleep(self.config.error_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }

        if self.contains(id).await? {
            warn!("rule #{id} still present after {max} delete attempts");
            Err(CoreError::RemovalUnverified {
                id: id.to_owned(),
                attempts: max,
            })
        } else {
            info!("rule #{id} removed");
            Ok(RemovalOutcome::Removed)
        }
    }

    async fn remove_attempt(
        &self,
        id: &str,
        attempt: u32,
    ) -> Result<Option<RemovalOutcome>, CoreError> {
        if !self.contains(id).await? {
            return Ok(Some(if attempt == 1 {
                debug!("rule #{id} already gone");
                RemovalOutcome::AlreadyGone
            } else {
                info!("rule #{id} removed");
                RemovalOutcome::Removed
            }));
        }
        self.delete(id).await?;
        Ok(None)
    }

    async fn contains(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.rules().await?.iter().any(|r| r.id == id))
    }

    /// Delete every rule, one per pass, re-reading the table each time.
    ///
    /// Ids `remove_by_id` gives up on are quarantined in `stuck` and never
    /// retried in this call. Anything else seen again on a later read, such
    /// as a stale row for a rule already deleted, goes back through
    /// `remove_by_id`, which re-reads and finds it gone.
    pub async fn remove_all(&self) -> Result<RemoveAllReport, CoreError> {
        let mut report = RemoveAllReport::default();

        loop {
            let rules = self.rules().await?;
            let Some(next) = rules.into_iter().find(|r| !report.stuck.contains(&r.id)) else {
                break;
            };

            info!("removing rule #{} ({})", next.id, next.url);
            match self.remove_by_id(&next.id).await {
                Ok(RemovalOutcome::Removed) => {
                    report.removed += 1;
                    sleep(self.config.removal_pause).await;
                }
                Ok(RemovalOutcome::AlreadyGone) => {
                    debug!("rule #{} was already gone", next.id);
                }
                Err(e) => {
                    warn!("giving up on rule #{}: {e}", next.id);
                    report.stuck.insert(next.id);
                }
            }
        }

        if report.stuck.is_empty() {
            info!("removed {} rules", report.removed);
        } else {
            warn!(
                "removed {} rules; {} could not be deleted: {:?}",
                report.removed,
                report.stuck.len(),
                report.stuck
            );
        }
        Ok(report)
    }
}

/// Human label for a rule's MAC: `"all devices"` for the empty MAC.
pub fn describe_target(mac: &str) -> String {
    if mac.is_empty() {
        "all devices".to_owned()
    } else {
        mac.to_owned()
    }
}
