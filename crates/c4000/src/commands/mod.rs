//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod devices;
pub mod rules_file;
pub mod urls;
pub mod util;
