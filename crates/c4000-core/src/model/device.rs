// ── Host table entries ──

use c4000_api::{CgiObject, ObjectsResponse};
use serde::{Deserialize, Serialize};

/// A LAN host known to the modem.
///
/// Hostname and IP may be blank or change between leases; only
/// `mac_address` identifies the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    pub ip_address: String,
    pub mac_address: String,
}

impl Device {
    /// Parse a `Device.Hosts.Host.N.` object. Hosts without a hardware
    /// address are placeholders, not devices, and yield `None`.
    pub fn from_object(object: &CgiObject) -> Option<Self> {
        let mac_address = object.param("PhysAddress").unwrap_or_default();
        if mac_address.is_empty() {
            return None;
        }
        Some(Self {
            hostname: object.param("HostName").unwrap_or_default(),
            ip_address: object.param("IPAddress").unwrap_or_default(),
            mac_address,
        })
    }

    /// Case-insensitive match against hostname, IP, or MAC. Blank fields
    /// never match.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        [&self.hostname, &self.ip_address, &self.mac_address]
            .into_iter()
            .any(|field| !field.is_empty() && field.eq_ignore_ascii_case(identifier))
    }
}

/// All real devices in a host-table response, in modem order.
pub fn parse_devices(response: &ObjectsResponse) -> Vec<Device> {
    response.objects.iter().filter_map(Device::from_object).collect()
}
