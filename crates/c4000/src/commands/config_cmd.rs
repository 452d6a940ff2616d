//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Format config for display as TOML, masking the password.
fn format_config_redacted(cfg: &c4000_config::Config, modem: &str) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    let _ = writeln!(out, "modem = \"{modem}\"");
    let _ = writeln!(out, "min_interval = {}", cfg.min_interval);
    let _ = writeln!(out, "post_write_delay = {}", cfg.post_write_delay);
    let _ = writeln!(out, "timeout = {}", cfg.timeout);
    let _ = writeln!(out, "creds_file = \"{}\"", cfg.creds_file.display());
    let _ = writeln!(out, "insecure = {}", cfg.insecure);
    if let Some(ref ca) = cfg.ca_cert {
        let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
    }
    if let Some(ref u) = cfg.username {
        let _ = writeln!(out, "username = \"{u}\"");
    }
    if cfg.password.is_some() {
        let _ = writeln!(out, "password = \"****\"");
    }

    out.trim_end().to_owned()
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let modem = config::modem_addr(&cfg);
            let redacted = cfg.redacted();
            let out = output::render_single(&global.output, &redacted, |c| {
                format_config_redacted(c, &modem)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { username } => {
            let cfg = config::load(global)?;
            let username = username.as_deref().or(cfg.username.as_deref());
            let (username, password) = config::prompt_credentials(username)?;
            c4000_config::store_password(&username, &password)?;
            output::print_output(
                &format!("Password for '{username}' stored in the system keyring."),
                global.quiet,
            );
            if cfg.username.as_deref() != Some(username.as_str()) {
                output::print_output(
                    &format!(
                        "Set username = \"{username}\" in {} to use it.",
                        config::config_path().display()
                    ),
                    global.quiet,
                );
            }
            Ok(())
        }
    }
}
