use mds_config_core::{render_depth, ConfigTree};

use crate::extract::ZoningSnapshot;
use crate::model::Member;

/// Render a parsed configuration with a configurable max depth.
pub fn render_tree(tree: &ConfigTree, max_depth: usize) -> String {
    render_depth(tree, max_depth)
}

/// Render extracted zoning entities, one block per kind.
pub fn render_snapshot(snapshot: &ZoningSnapshot) -> String {
    let mut out = Vec::new();

    out.push(format!("device_aliases count={}", snapshot.device_aliases.len()));
    for alias in snapshot.device_aliases.iter() {
        out.push(format!("- {} pwwn={}", alias.name, alias.pwwn));
    }

    out.push(format!("fc_aliases count={}", snapshot.fc_aliases.len()));
    for alias in snapshot.fc_aliases.values() {
        let pwwns: Vec<String> = alias.pwwns.iter().map(ToString::to_string).collect();
        out.push(format!(
            "- {} vsan={} pwwns={}",
            alias.name,
            alias.vsan,
            if pwwns.is_empty() {
                "none".to_string()
            } else {
                pwwns.join(",")
            }
        ));
    }

    out.push(format!("zones count={}", snapshot.zones.len()));
    for zone in &snapshot.zones {
        out.push(format!(
            "- {} vsan={} members={}",
            zone.name,
            zone.vsan,
            zone.members.len()
        ));
        for member in &zone.members {
            out.push(format!("  - {}", describe_member(member)));
        }
    }

    out.push(format!("zone_sets count={}", snapshot.zone_sets.len()));
    for set in &snapshot.zone_sets {
        out.push(format!(
            "- {} vsan={} zones={}",
            set.name,
            set.vsan,
            set.zones.join(",")
        ));
    }

    out.join("\n")
}

fn describe_member(member: &Member) -> String {
    match member {
        Member::FcAliasRef { name } => format!("fcalias {}", name.as_deref().unwrap_or("?")),
        Member::PwwnRef { pwwn, role } => match role {
            Some(role) => format!("pwwn {pwwn} {role}"),
            None => format!("pwwn {pwwn}"),
        },
        Member::DeviceAliasRef { name, role } => match role {
            Some(role) => format!("device-alias {name} {role}"),
            None => format!("device-alias {name}"),
        },
    }
}
