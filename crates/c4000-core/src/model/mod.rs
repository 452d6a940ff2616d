// ── Domain model ──
//
// Rules and devices as the reconciler sees them, parsed from the CGI
// object envelope. MAC address is the only stable key on either side.

pub mod device;
pub mod rule;

pub use device::Device;
pub use rule::{DesiredRuleSpec, Rule, normalize_url};
