//! Zoning entity extraction from parsed switch output.
//!
//! Every extractor walks a [`ConfigTree`] (or raw text for the device-alias
//! database) and returns the entities it could build together with the
//! [`ParseWarning`]s for lines it had to skip. A malformed line never aborts
//! extraction of its siblings.
//!
//! ## Recognized shapes
//!
//! - `fcalias name <name> vsan <id>` with `member pwwn <pwwn>` children
//! - `zone name <name> vsan <id>` with `member ...` children, or the expanded
//!   `show zoneset` form where `fcalias name ...` children carry `pwwn` lines
//! - `zoneset name <name> vsan <id>` with `member <zone>` / `zone name <zone>`
//! - `device-alias name <name> pwwn <pwwn>` anywhere in a line
//!
//! Everything else is opaque.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use mds_config_core::{ConfigNode, ConfigTree};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{DeviceAlias, FcAlias, Member, Pwwn, Role, Vsan, Zone, ZoneSet};

/// A line that could not be turned into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Extraction output plus the warnings collected on the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extracted<T> {
    pub value: T,
    pub warnings: Vec<ParseWarning>,
}

impl<T> Extracted<T> {
    fn new(value: T, warnings: Vec<ParseWarning>) -> Self {
        Self { value, warnings }
    }
}

fn fcalias_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^fcalias name").expect("valid pattern"))
}

fn zone_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"zone name").expect("valid pattern"))
}

fn zoneset_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^zoneset name").expect("valid pattern"))
}

fn fcalias_member() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"fcalias").expect("valid pattern"))
}

fn device_alias_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)device-alias\s+name\s+(\S+)\s+pwwn\s+(\S+)").expect("valid pattern")
    })
}

struct Warnings(Vec<ParseWarning>);

impl Warnings {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, line: usize, text: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(line, text, %reason, "skipping malformed line");
        self.0.push(ParseWarning {
            line,
            text: text.to_string(),
            reason,
        });
    }

    fn node(&mut self, node: &ConfigNode<'_>, reason: impl Into<String>) {
        self.push(node.line(), node.text(), reason);
    }
}

/// Read `<keyword> name <name> vsan <id>` header tokens.
fn name_and_vsan(node: &ConfigNode<'_>, warnings: &mut Warnings) -> Option<(String, Vsan)> {
    let (Some(name), Some(raw_vsan)) = (node.token(2), node.token(4)) else {
        warnings.node(node, "expected '<keyword> name <name> vsan <id>'");
        return None;
    };
    match raw_vsan.parse::<Vsan>() {
        Ok(vsan) => Some((name.to_string(), vsan)),
        Err(err) => {
            warnings.node(node, err.to_string());
            None
        }
    }
}

fn first_role(tokens: &[&str]) -> Option<Role> {
    tokens.iter().find_map(|t| Role::parse_keyword(t))
}

/// Collect `fcalias name <name> vsan <id>` definitions keyed by name.
///
/// The pwwn of each child is the token after the `pwwn` keyword, which is the
/// third token of the usual `member pwwn <pwwn>` line. A later definition of
/// the same name replaces the earlier one, whatever its vsan.
pub fn extract_fc_aliases(tree: &ConfigTree) -> Extracted<BTreeMap<String, FcAlias>> {
    let mut warnings = Warnings::new();
    let mut out = BTreeMap::new();

    for node in tree.find_objects(fcalias_header()) {
        let Some((name, vsan)) = name_and_vsan(&node, &mut warnings) else {
            continue;
        };

        let mut pwwns = Vec::new();
        for child in node.children() {
            let tokens = child.tokens();
            let raw = tokens
                .iter()
                .position(|t| t.eq_ignore_ascii_case("pwwn"))
                .and_then(|idx| tokens.get(idx + 1))
                .or_else(|| tokens.get(2));
            let Some(raw) = raw else {
                warnings.node(&child, "expected 'member pwwn <pwwn>'");
                continue;
            };
            match raw.parse::<Pwwn>() {
                Ok(pwwn) => pwwns.push(pwwn),
                Err(err) => warnings.node(&child, err.to_string()),
            }
        }

        if out.contains_key(&name) {
            debug!(fcalias = %name, line = node.line(), "fcalias redefined, keeping later definition");
        }
        out.insert(name.clone(), FcAlias { name, vsan, pwwns });
    }

    Extracted::new(out, warnings.0)
}

/// Collect every zone definition in source order.
///
/// Headers are found with an unanchored `zone name` search, so a line that
/// merely contains the phrase is treated as a zone header too.
pub fn extract_zones(tree: &ConfigTree) -> Extracted<Vec<Zone>> {
    let mut warnings = Warnings::new();
    let mut out = Vec::new();

    for node in tree.find_objects(zone_header()) {
        let Some((name, vsan)) = name_and_vsan(&node, &mut warnings) else {
            continue;
        };

        let mut members = Vec::new();
        for child in node.children() {
            if fcalias_member().is_match(child.text()) {
                members.push(Member::FcAliasRef {
                    name: child.token(2).map(ToOwned::to_owned),
                });
                for grandchild in child.children() {
                    let tokens = grandchild.tokens();
                    let Some(raw) = tokens.get(1) else {
                        warnings.node(&grandchild, "expected 'pwwn <pwwn>'");
                        continue;
                    };
                    match raw.parse::<Pwwn>() {
                        Ok(pwwn) => members.push(Member::PwwnRef {
                            pwwn,
                            role: first_role(&tokens[2..]),
                        }),
                        Err(err) => warnings.node(&grandchild, err.to_string()),
                    }
                }
                continue;
            }

            match direct_member(&child, &mut warnings) {
                Some(Some(member)) => members.push(member),
                Some(None) => {}
                None => debug!(line = child.line(), text = child.text(), "opaque zone child"),
            }
        }

        out.push(Zone {
            name,
            vsan,
            members,
        });
    }

    Extracted::new(out, warnings.0)
}

/// Parse `[member] pwwn <pwwn> [role]` and `[member] device-alias <name> [role]`.
///
/// Returns `None` for lines of another shape, `Some(None)` for a recognized
/// but malformed line (already recorded as a warning).
fn direct_member(node: &ConfigNode<'_>, warnings: &mut Warnings) -> Option<Option<Member>> {
    let tokens = node.tokens();
    let rest = match tokens.first() {
        Some(&"member") => &tokens[1..],
        _ => &tokens[..],
    };

    match rest {
        [kind, value, tail @ ..] if kind.eq_ignore_ascii_case("pwwn") => {
            Some(match value.parse::<Pwwn>() {
                Ok(pwwn) => Some(Member::PwwnRef {
                    pwwn,
                    role: first_role(tail),
                }),
                Err(err) => {
                    warnings.node(node, err.to_string());
                    None
                }
            })
        }
        [kind, value, tail @ ..] if kind.eq_ignore_ascii_case("device-alias") => {
            Some(Some(Member::DeviceAliasRef {
                name: value.to_string(),
                role: first_role(tail),
            }))
        }
        [kind] if kind.eq_ignore_ascii_case("pwwn") || kind.eq_ignore_ascii_case("device-alias") => {
            warnings.node(node, format!("expected a value after '{kind}'"));
            Some(None)
        }
        _ => None,
    }
}

/// Collect `zoneset name <name> vsan <id>` definitions in source order.
pub fn extract_zone_sets(tree: &ConfigTree) -> Extracted<Vec<ZoneSet>> {
    let mut warnings = Warnings::new();
    let mut out = Vec::new();

    for node in tree.find_objects(zoneset_header()) {
        let Some((name, vsan)) = name_and_vsan(&node, &mut warnings) else {
            continue;
        };

        let mut zones = Vec::new();
        for child in node.children() {
            match child.tokens().as_slice() {
                ["zone", "name", zone, ..] => zones.push((*zone).to_string()),
                ["member" | "zone", zone, ..] => zones.push((*zone).to_string()),
                ["member" | "zone"] => warnings.node(&child, "expected a zone name"),
                _ => debug!(line = child.line(), text = child.text(), "opaque zoneset child"),
            }
        }

        out.push(ZoneSet { name, vsan, zones });
    }

    Extracted::new(out, warnings.0)
}

/// Result of looking up which aliases are bound to a pwwn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PwwnLookup<'a> {
    NotFound,
    Bound(&'a str),
    /// More than one alias name is bound to the same pwwn.
    Conflict(Vec<&'a str>),
}

/// Device-alias bindings indexed by name and by pwwn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceAliasDatabase {
    by_name: BTreeMap<String, Pwwn>,
    #[serde(skip)]
    by_pwwn: BTreeMap<Pwwn, Vec<String>>,
}

impl DeviceAliasDatabase {
    /// Bind `name` to `pwwn`, replacing any earlier binding of `name`.
    pub fn insert(&mut self, name: impl Into<String>, pwwn: Pwwn) {
        let name = name.into();
        if let Some(previous) = self.by_name.insert(name.clone(), pwwn) {
            if let Some(names) = self.by_pwwn.get_mut(&previous) {
                names.retain(|n| n != &name);
                if names.is_empty() {
                    self.by_pwwn.remove(&previous);
                }
            }
        }
        self.by_pwwn.entry(pwwn).or_default().push(name);
    }

    /// Alias names bound to `pwwn`, in definition order.
    pub fn aliases_for(&self, pwwn: &Pwwn) -> &[String] {
        self.by_pwwn.get(pwwn).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lookup(&self, pwwn: &Pwwn) -> PwwnLookup<'_> {
        match self.aliases_for(pwwn) {
            [] => PwwnLookup::NotFound,
            [only] => PwwnLookup::Bound(only),
            many => PwwnLookup::Conflict(many.iter().map(String::as_str).collect()),
        }
    }

    pub fn pwwn_of(&self, name: &str) -> Option<Pwwn> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// All bindings ordered by alias name.
    pub fn iter(&self) -> impl Iterator<Item = DeviceAlias> + '_ {
        self.by_name.iter().map(|(name, pwwn)| DeviceAlias {
            name: name.clone(),
            pwwn: *pwwn,
        })
    }

    fn scan_line(&mut self, line: usize, text: &str, warnings: &mut Warnings) {
        let Some(caps) = device_alias_entry().captures(text) else {
            return;
        };
        match caps[2].parse::<Pwwn>() {
            Ok(pwwn) => self.insert(&caps[1], pwwn),
            Err(err) => warnings.push(line, text.trim(), err.to_string()),
        }
    }
}

/// Build the device-alias lookup from `show device-alias database` output in
/// a single pass.
pub fn extract_device_alias_database(text: &str) -> Extracted<DeviceAliasDatabase> {
    let mut warnings = Warnings::new();
    let mut db = DeviceAliasDatabase::default();
    for (idx, line) in text.lines().enumerate() {
        db.scan_line(idx + 1, line, &mut warnings);
    }
    Extracted::new(db, warnings.0)
}

/// Build the device-alias lookup from a parsed configuration dump.
pub fn extract_device_aliases(tree: &ConfigTree) -> Extracted<DeviceAliasDatabase> {
    let mut warnings = Warnings::new();
    let mut db = DeviceAliasDatabase::default();
    for node in tree.iter() {
        db.scan_line(node.line(), node.text(), &mut warnings);
    }
    Extracted::new(db, warnings.0)
}

/// All zoning entities found in one configuration dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoningSnapshot {
    pub device_aliases: DeviceAliasDatabase,
    pub fc_aliases: BTreeMap<String, FcAlias>,
    pub zones: Vec<Zone>,
    pub zone_sets: Vec<ZoneSet>,
}

/// Run every extractor over `tree`.
pub fn extract_zoning(tree: &ConfigTree) -> Extracted<ZoningSnapshot> {
    let device_aliases = extract_device_aliases(tree);
    let fc_aliases = extract_fc_aliases(tree);
    let zones = extract_zones(tree);
    let zone_sets = extract_zone_sets(tree);

    let mut warnings = device_aliases.warnings;
    warnings.extend(fc_aliases.warnings);
    warnings.extend(zones.warnings);
    warnings.extend(zone_sets.warnings);
    warnings.sort_by_key(|w| w.line);

    Extracted::new(
        ZoningSnapshot {
            device_aliases: device_aliases.value,
            fc_aliases: fc_aliases.value,
            zones: zones.value,
            zone_sets: zone_sets.value,
        },
        warnings,
    )
}
