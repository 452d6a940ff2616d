//! Device command handlers.

use c4000_api::SessionClient;
use c4000_core::{Device, DeviceResolver};
use tabled::Tabled;

use crate::cli::{DeviceArgs, DeviceCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "IP Address")]
    ip: String,
    #[tabled(rename = "MAC Address")]
    mac: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let or_na = |s: &str| {
            if s.is_empty() {
                "N/A".to_owned()
            } else {
                s.to_owned()
            }
        };
        Self {
            hostname: or_na(&d.hostname),
            ip: or_na(&d.ip_address),
            mac: d.mac_address.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DeviceCommand::List => {
            let session = config::connect(global).await?;
            list(&session, global).await
        }
    }
}

async fn list(session: &SessionClient, global: &GlobalOpts) -> Result<(), CliError> {
    let resolver = DeviceResolver::new(session);

    if global.debug {
        let raw = resolver.fetch_devices_raw().await?;
        eprintln!("--- Raw Modem Response ---");
        eprintln!("{}", output::render_json_pretty(&raw)?);
        eprintln!("--- End Raw Response ---");
    }

    let devices = resolver.devices().await?;
    if devices.is_empty() && matches!(global.output, OutputFormat::Table) {
        output::print_output("No devices found on the network map.", global.quiet);
        return Ok(());
    }

    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.mac_address.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
