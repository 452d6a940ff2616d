// ── Default modem address ──

use std::net::Ipv4Addr;

use tracing::{debug, warn};

/// Used when the default gateway cannot be determined.
pub const FALLBACK_MODEM_ADDR: &str = "192.168.0.1";

const ROUTE_TABLE: &str = "/proc/net/route";

/// Find the IPv4 default gateway in a `/proc/net/route` dump.
///
/// Addresses there are little-endian hex, so `0100A8C0` is `192.168.0.1`.
pub fn parse_default_gateway(route_table: &str) -> Option<Ipv4Addr> {
    route_table.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let _iface = fields.next()?;
        let destination = fields.next()?;
        let gateway = fields.next()?;
        if destination != "00000000" {
            return None;
        }
        let raw = u32::from_str_radix(gateway, 16).ok()?;
        let addr = Ipv4Addr::from(raw.swap_bytes());
        (!addr.is_unspecified()).then_some(addr)
    })
}

/// The default gateway, or [`FALLBACK_MODEM_ADDR`].
pub fn default_modem_addr() -> String {
    match std::fs::read_to_string(ROUTE_TABLE)
        .ok()
        .as_deref()
        .and_then(parse_default_gateway)
    {
        Some(addr) => {
            debug!("using default gateway {addr} as modem address");
            addr.to_string()
        }
        None => {
            warn!("could not determine default gateway, using fallback {FALLBACK_MODEM_ADDR}");
            FALLBACK_MODEM_ADDR.to_owned()
        }
    }
}
