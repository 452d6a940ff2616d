//! Clap derive structures for the `c4000` CLI.
//!
//! Defines the command tree and global flags. Kept free of crate-internal
//! imports so `build.rs` can include it for man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// c4000 -- URL blocking for C4000-series modems
#[derive(Debug, Parser)]
#[command(
    name = "c4000",
    version,
    about = "Control and query a C4000-series modem",
    long_about = "Manage URL blocking rules on a C4000-series modem through its web admin \
        interface.\n\n\
        Every change is verified against a fresh read of the modem's rule table, \
        so commands are safe to re-run after a failure or interruption.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Modem address [default: your default gateway]
    #[arg(long, short = 'm', env = "C4000_MODEM", global = true)]
    pub modem: Option<String>,

    /// Enable debug output, including raw modem responses
    #[arg(long, global = true)]
    pub debug: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Wait for Enter before exiting
    #[arg(long, global = true)]
    pub wait: bool,

    /// Minimum interval between modem requests, in seconds [default: 2.0]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub delay: Option<f64>,

    /// Pause after every write while the modem commits it, in seconds [default: 7.0]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub post_write_delay: Option<f64>,

    /// Request timeout in seconds [default: 30]
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Credentials file with USERNAME= and PASSWORD= lines
    #[arg(long, value_name = "PATH", global = true)]
    pub creds_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "C4000_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List devices known to the modem
    #[command(alias = "devices")]
    Device(DeviceArgs),

    /// Manage URL blocking rules
    #[command(alias = "urls")]
    Url(UrlArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// List all known devices on the network
    #[command(alias = "ls")]
    List,
}

// ── URL rules ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UrlArgs {
    #[command(subcommand)]
    pub command: UrlCommand,
}

#[derive(Debug, Subcommand)]
pub enum UrlCommand {
    /// List all URL blocking rules
    #[command(alias = "ls")]
    List,

    /// Add URL blocking rules
    Add(RuleArgs),

    /// Remove rules by matching device and URL
    #[command(alias = "rm")]
    Remove(RuleArgs),

    /// Remove a single rule by its number (see `url list`)
    RemoveId {
        /// Rule number
        rule_id: u32,
    },

    /// Remove ALL URL blocking rules from the modem
    RemoveAll,
}

/// Rules given inline (`--device` + `--block`) or from a file.
#[derive(Debug, Args)]
pub struct RuleArgs {
    /// Target device: hostname, IP, MAC, or 'all'
    #[arg(
        long,
        required_unless_present = "rules_file",
        conflicts_with = "rules_file",
        requires = "block"
    )]
    pub device: Option<String>,

    /// URL to block; comma-separated or repeated
    #[arg(long, value_name = "URL", value_delimiter = ',', conflicts_with = "rules_file")]
    pub block: Vec<String>,

    /// File of `device,url` lines
    #[arg(long, value_name = "PATH")]
    pub rules_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration (password redacted)
    Show,

    /// Store the modem password in the system keyring
    SetPassword {
        /// Modem username [default: from config, or prompt]
        #[arg(long)]
        username: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
