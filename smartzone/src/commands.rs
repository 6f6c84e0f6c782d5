//! MDS command vocabulary and apply-mode generation.

use crate::intent::ZoningIntent;
use crate::model::{ValidationTarget, Vsan};

pub const TERMINAL_LENGTH_ZERO: &str = "terminal length 0";
pub const SHOW_DEVICE_ALIAS_DATABASE: &str = "show device-alias database";

pub fn show_zoneset_brief(vsan: Vsan) -> String {
    format!("show zoneset brief vsan {vsan}")
}

pub fn show_zone(zone: &str) -> String {
    format!("show zone name {zone}")
}

pub fn zoneset_activate(name: &str, vsan: Vsan) -> String {
    format!("zoneset activate name {name} vsan {vsan}")
}

/// Configuration commands that create the device aliases, smart zones and zone
/// set described by `intent`, activate the zone set and save the result.
///
/// Lines inside a configuration block are indented by two spaces.
pub fn generate_commands(intent: &ZoningIntent, target: &ValidationTarget) -> Vec<String> {
    let mut out = vec!["config t".to_string(), "device-alias database".to_string()];
    for host in intent.hosts() {
        out.push(format!("  device-alias name {} pwwn {}", host.name, host.pwwn));
    }
    out.push("device-alias commit".to_string());

    for zone in intent.zones() {
        out.push(format!("zone name {} vsan {}", zone.name, target.vsan));
        for name in &zone.hosts {
            // build() guarantees every zone host is declared
            if let Some(host) = intent.host(name) {
                out.push(format!("  member device-alias {} {}", host.name, host.role));
            }
        }
        out.push("exit".to_string());
    }

    out.push(format!("zoneset name {} vsan {}", target.zoneset, target.vsan));
    for zone in intent.zones() {
        out.push(format!("  member {}", zone.name));
    }
    out.push("exit".to_string());

    out.push(zoneset_activate(&target.zoneset, target.vsan));
    out.push("copy running-config startup-config".to_string());
    out
}
