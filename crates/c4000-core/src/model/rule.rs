// ── URL filter rules ──

use std::fmt;

use c4000_api::{CgiObject, ObjectsResponse};
use serde::{Deserialize, Serialize};

/// One row of `Device.Firewall.X_LANTIQ_COM_URLFilter`.
///
/// `id` names a row, not a logical rule: the modem renumbers on reboot and
/// on re-creation. Logical identity is `(url, mac_address)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// Normalized: percent-decoded, scheme stripped, backslashes removed.
    pub url: String,
    /// Empty means the rule applies to every LAN device.
    pub mac_address: String,
}

impl Rule {
    /// Parse a `...URLFilter.Rule.N.` object. Non-rule objects, malformed
    /// names, and rules with no URL yield `None`.
    pub fn from_object(object: &CgiObject) -> Option<Self> {
        if !object.obj_name.contains("Rule") {
            return None;
        }
        // "Device.Firewall.X_LANTIQ_COM_URLFilter.Rule.3." -> "3"
        let id = object.obj_name.rsplit('.').nth(1)?.to_owned();

        let url = normalize_url(&object.param("URL").unwrap_or_default());
        if url.is_empty() {
            return None;
        }

        Some(Self {
            id,
            url,
            mac_address: object.param("MACAddress").unwrap_or_default(),
        })
    }

    /// Exact match on the logical identity.
    pub fn matches(&self, domain: &str, mac_address: &str) -> bool {
        self.url == domain && self.mac_address == mac_address
    }

    pub fn applies_to_all(&self) -> bool {
        self.mac_address.is_empty()
    }
}

/// All rules in a URL-filter response, in modem order.
pub fn parse_rules(response: &ObjectsResponse) -> Vec<Rule> {
    response.objects.iter().filter_map(Rule::from_object).collect()
}

/// Undo the modem's storage encoding: `http%3A%2F%2Fexample.com` and
/// `http:\/\/example.com` both become `example.com`.
pub fn normalize_url(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), |s| s.into_owned());
    decoded.replace('\\', "").replace("http://", "")
}

/// One `(device identifier, domain)` pair requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredRuleSpec {
    /// Hostname, IP, MAC, or `all`. Resolved before reconciliation.
    pub device: String,
    pub domain: String,
}

impl DesiredRuleSpec {
    pub fn new(device: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for DesiredRuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.device, self.domain)
    }
}
