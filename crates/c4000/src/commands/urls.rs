//! URL rule command handlers.

use std::collections::HashMap;

use c4000_core::{
    BatchReport, CoreError, DesiredRuleSpec, Device, EnsureOutcome, RemovalOutcome,
    RemoveAllReport, Rule, RuleReconciler, RuleResult,
};
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use crate::cli::{GlobalOpts, OutputFormat, RuleArgs, UrlArgs, UrlCommand};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Status};

use super::{rules_file, util};

const ALL_LAN_DEVICES: &str = "All LAN Devices";

// ── Listing ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ListedRule {
    id: String,
    url: String,
    mac_address: String,
    applied_to: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Rule #")]
    id: String,
    #[tabled(rename = "Applied To")]
    applied_to: String,
    #[tabled(rename = "Blocked URL")]
    url: String,
}

impl From<&ListedRule> for RuleRow {
    fn from(r: &ListedRule) -> Self {
        Self {
            id: r.id.clone(),
            applied_to: r.applied_to.clone(),
            url: r.url.clone(),
        }
    }
}

/// "All LAN Devices", `hostname (ip)` for a known MAC, or the raw MAC.
fn applied_to(rule: &Rule, devices: &HashMap<&str, &Device>) -> String {
    if rule.applies_to_all() {
        return ALL_LAN_DEVICES.to_owned();
    }
    devices.get(rule.mac_address.as_str()).map_or_else(
        || rule.mac_address.clone(),
        |d| {
            let name = if d.hostname.is_empty() { "N/A" } else { d.hostname.as_str() };
            format!("{name} ({})", d.ip_address)
        },
    )
}

// ── Batch report ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ReportEntry {
    action: &'static str,
    device: String,
    domain: String,
    mac: Option<String>,
    #[serde(skip)]
    status: Status,
    result: String,
    detail: String,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn describe(outcome: &EnsureOutcome) -> (Status, String) {
    match outcome {
        EnsureOutcome::AlreadyPresent => (Status::Ok, "already exists".into()),
        EnsureOutcome::AlreadyAbsent => (Status::Ok, "not present".into()),
        EnsureOutcome::VerifiedPresent { attempts } => {
            (Status::Changed, format!("added (verified on attempt {attempts})"))
        }
        EnsureOutcome::VerifiedAbsent { attempts } => {
            (Status::Changed, format!("removed (verified on attempt {attempts})"))
        }
        EnsureOutcome::DuplicatesRemoved { removed, stuck } if stuck.is_empty() => {
            (Status::Changed, format!("removed {removed} duplicate(s)"))
        }
        EnsureOutcome::DuplicatesRemoved { removed, stuck } => (
            Status::Changed,
            format!(
                "removed {removed} duplicate(s); stuck: {}",
                stuck.join(", ")
            ),
        ),
    }
}

impl From<&RuleResult> for ReportEntry {
    fn from(r: &RuleResult) -> Self {
        let (status, detail) = match &r.outcome {
            Ok(outcome) => describe(outcome),
            Err(CoreError::ResolutionNotFound { identifier }) => {
                (Status::Skipped, format!("no device matches '{identifier}'"))
            }
            Err(e) => (Status::Failed, e.to_string()),
        };
        Self {
            action: r.desired.action(),
            device: r.spec.device.clone(),
            domain: r.spec.domain.clone(),
            mac: r.mac.clone(),
            status,
            result: status.label(false),
            detail,
        }
    }
}

fn render_report(report: &BatchReport, global: &GlobalOpts) -> Result<(), CliError> {
    let entries: Vec<ReportEntry> = report.results.iter().map(ReportEntry::from).collect();
    let color = output::should_color(&global.color);

    let out = output::render_list(
        &global.output,
        &entries,
        |e| ReportRow {
            action: e.action.to_owned(),
            device: e.device.clone(),
            domain: e.domain.clone(),
            result: e.status.label(color),
            detail: e.detail.clone(),
        },
        |e| format!("{}\t{},{}", e.result, e.device, e.domain),
    )?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) {
        let summary = format!(
            "{} succeeded, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        output::print_output(&summary, global.quiet);
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: UrlArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        UrlCommand::List => {
            let session = config::connect(global).await?;
            list(&RuleReconciler::new(&session), global).await
        }

        UrlCommand::Add(rule_args) => {
            let specs = specs(&rule_args)?;
            let session = config::connect(global).await?;
            let report = RuleReconciler::new(&session)
                .ensure_rules_present(&specs)
                .await?;
            render_report(&report, global)
        }

        UrlCommand::Remove(rule_args) => {
            let specs = specs(&rule_args)?;
            let session = config::connect(global).await?;
            let report = RuleReconciler::new(&session)
                .ensure_rules_absent(&specs)
                .await?;
            render_report(&report, global)
        }

        UrlCommand::RemoveId { rule_id } => {
            let id = rule_id.to_string();
            let session = config::connect(global).await?;
            let message = match RuleReconciler::new(&session).remove_by_id(&id).await? {
                RemovalOutcome::AlreadyGone => format!("Rule #{id} is already gone."),
                RemovalOutcome::Removed => format!("Rule #{id} removed."),
            };
            output::print_output(&message, global.quiet);
            Ok(())
        }

        UrlCommand::RemoveAll => {
            if !util::confirm(
                "Remove ALL URL blocking rules from the modem?",
                "url remove-all",
                global.yes,
            )? {
                return Ok(());
            }
            let session = config::connect(global).await?;
            let report = RuleReconciler::new(&session).remove_all().await?;
            let out = output::render_single(&global.output, &report, remove_all_summary)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn remove_all_summary(report: &RemoveAllReport) -> String {
    if report.stuck.is_empty() {
        return format!("Removed {} rule(s). No rules remaining.", report.removed);
    }
    let ids: Vec<&str> = report.stuck.iter().map(String::as_str).collect();
    format!(
        "Removed {} rule(s). {} ghost rule(s) could not be removed: {}",
        report.removed,
        ids.len(),
        ids.join(", ")
    )
}

/// Rule specs from `--rules-file`, or `--device` crossed with `--block`.
fn specs(args: &RuleArgs) -> Result<Vec<DesiredRuleSpec>, CliError> {
    if let Some(ref path) = args.rules_file {
        let rules = rules_file::read_rules_file(path)?;
        if rules.is_empty() {
            warn!("no rules found in {}", path.display());
        }
        return Ok(rules);
    }

    let device = args.device.as_deref().ok_or_else(|| CliError::Validation {
        field: "device".into(),
        reason: "--device or --rules-file is required".into(),
    })?;
    let domains = util::domains(&args.block);
    if domains.is_empty() {
        return Err(CliError::Validation {
            field: "block".into(),
            reason: "--block must be specified with --device".into(),
        });
    }
    Ok(domains
        .into_iter()
        .map(|domain| DesiredRuleSpec::new(device, domain))
        .collect())
}

async fn list(reconciler: &RuleReconciler<'_>, global: &GlobalOpts) -> Result<(), CliError> {
    if global.debug {
        let raw = reconciler.fetch_rules_raw().await?;
        eprintln!("--- Raw Modem Response ---");
        eprintln!("{}", output::render_json_pretty(&raw)?);
        eprintln!("--- End Raw Response ---");
    }

    let rules = reconciler.rules().await?;
    let devices = match reconciler.resolver().devices().await {
        Ok(devices) => devices,
        Err(e) => {
            warn!("could not fetch device list, showing raw MAC addresses: {e}");
            Vec::new()
        }
    };
    let lookup: HashMap<&str, &Device> = devices
        .iter()
        .map(|d| (d.mac_address.as_str(), d))
        .collect();

    if rules.is_empty() && matches!(global.output, OutputFormat::Table) {
        output::print_output(
            "No URL filtering rules are currently configured.",
            global.quiet,
        );
        return Ok(());
    }

    let listed: Vec<ListedRule> = rules
        .iter()
        .map(|r| ListedRule {
            id: r.id.clone(),
            url: r.url.clone(),
            mac_address: r.mac_address.clone(),
            applied_to: applied_to(r, &lookup),
        })
        .collect();

    let out = output::render_list(
        &global.output,
        &listed,
        |r| RuleRow::from(r),
        |r| r.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
