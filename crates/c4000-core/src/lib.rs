//! Reconciliation layer between `c4000-api` and the CLI.
//!
//! The modem's URL filter has no transactions: every change is a separate
//! POST, writes cannot be retried blindly, and the rule table sometimes
//! holds duplicates or rows that refuse to die. This crate drives that
//! table toward a desired state by re-reading it before every decision:
//!
//! - **[`DeviceResolver`]** — maps a hostname, IP, MAC, or `"all"` to the
//!   hardware address a rule is keyed on.
//!
//! - **[`RuleReconciler`]** — idempotent ensure-present / ensure-absent per
//!   `(domain, mac)` target, duplicate repair, removal by id, and bulk
//!   removal with quarantine of undeletable ("ghost") rows.
//!
//! - **Domain model** ([`model`]) — [`Rule`], [`Device`], and
//!   [`DesiredRuleSpec`], parsed from the CGI object envelope.

pub mod error;
pub mod model;
pub mod reconcile;
pub mod resolver;

pub use error::CoreError;
pub use model::{DesiredRuleSpec, Device, Rule};
pub use reconcile::{
    BatchReport, DesiredState, EnsureOutcome, MAX_RETRIES, ReconcilerConfig, RemoveAllReport,
    RemovalOutcome, RuleReconciler, RuleResult,
};
pub use resolver::{ALL_DEVICES, DeviceResolver, Resolution};
