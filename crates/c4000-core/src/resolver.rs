// ── Device resolution ──
//
// Maps user-supplied identifiers to the hardware address a URL rule is keyed
// on. "all" is answered locally; everything else needs the live host table.

use std::collections::HashMap;

use c4000_api::SessionClient;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::Device;
use crate::model::device::parse_devices;

/// Sentinel identifier meaning "every LAN device" (MAC `""`).
pub const ALL_DEVICES: &str = "all";

/// Host table object path.
pub const HOSTS_OBJECT: &str = "Device.Hosts.Host";

/// Outcome of resolving one identifier.
///
/// `Found("")` means all devices. `NotFound` is an ordinary result the caller
/// acts on, never an empty MAC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

pub struct DeviceResolver<'a> {
    session: &'a SessionClient,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(session: &'a SessionClient) -> Self {
        Self { session }
    }

    /// Raw host table JSON, for debug dumps.
    pub async fn fetch_devices_raw(&self) -> Result<serde_json::Value, CoreError> {
        Ok(self.session.fetch_object(HOSTS_OBJECT).await?)
    }

    /// Real devices (non-empty MAC) currently known to the modem.
    pub async fn devices(&self) -> Result<Vec<Device>, CoreError> {
        let response = self.session.fetch_objects(HOSTS_OBJECT).await?;
        let devices = parse_devices(&response);
        debug!(count = devices.len(), "fetched host table");
        Ok(devices)
    }

    /// Resolve a batch of identifiers against one host-table read.
    ///
    /// The table is fetched at most once, and not at all when every
    /// identifier is `"all"`. A failed fetch aborts the whole batch.
    pub async fn resolve_many<'i, I>(
        &self,
        identifiers: I,
    ) -> Result<HashMap<String, Resolution>, CoreError>
    where
        I: IntoIterator<Item = &'i str>,
    {
        let mut pending: Vec<&str> = Vec::new();
        for identifier in identifiers {
            if !pending.contains(&identifier) {
                pending.push(identifier);
            }
        }

        let devices = if pending.iter().all(|id| is_all(id)) {
            Vec::new()
        } else {
            self.devices().await?
        };

        let mut resolved = HashMap::with_capacity(pending.len());
        for identifier in pending {
            let resolution = if is_all(identifier) {
                Resolution::Found(String::new())
            } else {
                resolve_from(&devices, identifier)
            };
            if resolution == Resolution::NotFound {
                warn!("could not find any device matching '{identifier}'");
            }
            resolved.insert(identifier.to_owned(), resolution);
        }
        Ok(resolved)
    }
}

fn is_all(identifier: &str) -> bool {
    identifier.eq_ignore_ascii_case(ALL_DEVICES)
}

/// Single pass over `devices`; the first device whose hostname, IP, or MAC
/// matches wins.
pub fn resolve_from(devices: &[Device], identifier: &str) -> Resolution {
    if is_all(identifier) {
        return Resolution::Found(String::new());
    }
    devices
        .iter()
        .find(|d| d.matches_identifier(identifier))
        .map_or(Resolution::NotFound, |d| {
            debug!("resolved '{identifier}' to {}", d.mac_address);
            Resolution::Found(d.mac_address.clone())
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn devices() -> Vec<Device> {
        vec![
            Device {
                hostname: "laptop".into(),
                ip_address: "192.168.0.10".into(),
                mac_address: "AA:BB:CC:DD:EE:01".into(),
            },
            Device {
                hostname: String::new(),
                ip_address: "192.168.0.11".into(),
                mac_address: "AA:BB:CC:DD:EE:02".into(),
            },
        ]
    }

    #[test]
    fn all_is_the_empty_mac() {
        assert_eq!(resolve_from(&[], "ALL"), Resolution::Found(String::new()));
    }

    #[test]
    fn resolves_by_hostname_ip_and_mac() {
        let devices = devices();
        let mac = |s: &str| Resolution::Found(s.to_owned());
        assert_eq!(resolve_from(&devices, "LAPTOP"), mac("AA:BB:CC:DD:EE:01"));
        assert_eq!(resolve_from(&devices, "192.168.0.11"), mac("AA:BB:CC:DD:EE:02"));
        assert_eq!(resolve_from(&devices, "aa:bb:cc:dd:ee:02"), mac("AA:BB:CC:DD:EE:02"));
    }

    #[test]
    fn unknown_identifier_is_not_found_not_all() {
        let devices = devices();
        assert_eq!(resolve_from(&devices, "tv"), Resolution::NotFound);
        assert_eq!(resolve_from(&devices, ""), Resolution::NotFound);
    }
}
