//! Shared helpers for command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the operation is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Block until the user presses Enter (`--wait`).
pub fn wait_for_enter() {
    let mut stdout = io::stdout().lock();
    let _ = write!(stdout, "Press Enter to exit...");
    let _ = stdout.flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}

/// Expand `--block` values: trim and drop empties.
pub fn domains(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}
