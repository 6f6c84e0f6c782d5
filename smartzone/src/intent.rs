//! Declared zoning intent and its TOML loader.
//!
//! An intent file lists hosts with one pwwn per fabric side and the zones each
//! host belongs to:
//!
//! ```toml
//! [[host]]
//! name = "esx01_hba0"
//! zones = ["Z_ESX_PROD"]
//! role = "initiator"
//!
//! [host.pwwn]
//! fabric_a = "10:00:00:00:c9:aa:bb:01"
//! fabric_b = "10:00:00:00:c9:aa:bb:02"
//! ```
//!
//! Loading selects one fabric side; a host without a pwwn for it is an error.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Pwwn, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostIntent {
    pub name: String,
    pub pwwn: Pwwn,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneIntent {
    pub name: String,
    /// Host names in declaration order.
    pub hosts: Vec<String>,
}

/// Hosts and zones declared for one fabric side.
///
/// Every host named by a zone is guaranteed to be present in [`hosts`](Self::hosts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoningIntent {
    fabric: String,
    hosts: Vec<HostIntent>,
    zones: Vec<ZoneIntent>,
}

impl ZoningIntent {
    pub fn builder(fabric: impl Into<String>) -> ZoningIntentBuilder {
        ZoningIntentBuilder {
            fabric: fabric.into(),
            hosts: Vec::new(),
            zones: Vec::new(),
        }
    }

    pub fn fabric(&self) -> &str {
        &self.fabric
    }

    pub fn hosts(&self) -> &[HostIntent] {
        &self.hosts
    }

    /// Zones in first-seen order.
    pub fn zones(&self) -> &[ZoneIntent] {
        &self.zones
    }

    pub fn host(&self, name: &str) -> Option<&HostIntent> {
        self.hosts.iter().find(|h| h.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ZoningIntentBuilder {
    fabric: String,
    hosts: Vec<HostIntent>,
    zones: Vec<ZoneIntent>,
}

impl ZoningIntentBuilder {
    pub fn add_host(
        &mut self,
        name: impl Into<String>,
        pwwn: Pwwn,
        role: Role,
    ) -> Result<&mut Self, IntentLoadError> {
        let name = name.into();
        if self.hosts.iter().any(|h| h.name == name) {
            return Err(IntentLoadError::DuplicateHost { host: name });
        }
        self.hosts.push(HostIntent { name, pwwn, role });
        Ok(self)
    }

    /// Add `host` to `zone`, creating the zone on first use. Repeats are ignored.
    pub fn add_zone_member(&mut self, zone: impl Into<String>, host: impl Into<String>) -> &mut Self {
        let zone = zone.into();
        let host = host.into();
        let idx = match self.zones.iter().position(|z| z.name == zone) {
            Some(idx) => idx,
            None => {
                self.zones.push(ZoneIntent {
                    name: zone,
                    hosts: Vec::new(),
                });
                self.zones.len() - 1
            }
        };
        let hosts = &mut self.zones[idx].hosts;
        if !hosts.contains(&host) {
            hosts.push(host);
        }
        self
    }

    pub fn build(self) -> Result<ZoningIntent, IntentLoadError> {
        for zone in &self.zones {
            for host in &zone.hosts {
                if !self.hosts.iter().any(|h| &h.name == host) {
                    return Err(IntentLoadError::UnknownHost {
                        zone: zone.name.clone(),
                        host: host.clone(),
                    });
                }
            }
        }
        Ok(ZoningIntent {
            fabric: self.fabric,
            hosts: self.hosts,
            zones: self.zones,
        })
    }
}

#[derive(Debug, Error)]
pub enum IntentLoadError {
    #[error("intent file {path} not found")]
    NotFound { path: PathBuf },
    #[error("failed to read intent file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed intent file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("host '{host}' is declared more than once")]
    DuplicateHost { host: String },
    #[error("zone '{zone}' references undeclared host '{host}'")]
    UnknownHost { zone: String, host: String },
}

impl IntentLoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IntentLoadError::NotFound { .. })
    }
}

/// Something that can produce a [`ZoningIntent`] from an identifier.
pub trait IntentSource {
    fn load(&self, identifier: &str) -> Result<ZoningIntent, IntentLoadError>;
}

/// Loads intent files in the TOML host-list format for one fabric side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlIntentSource {
    pub fabric: String,
}

impl TomlIntentSource {
    pub fn new(fabric: impl Into<String>) -> Self {
        Self {
            fabric: fabric.into(),
        }
    }

    pub fn load_path(&self, path: &Path) -> Result<ZoningIntent, IntentLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                IntentLoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IntentLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        self.from_toml_str(&raw, path)
    }

    pub fn from_toml_str(&self, raw: &str, path: &Path) -> Result<ZoningIntent, IntentLoadError> {
        let malformed = |reason: String| IntentLoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let file: IntentFile = toml::from_str(raw).map_err(|err| malformed(err.to_string()))?;
        let mut builder = ZoningIntent::builder(&self.fabric);

        for entry in &file.host {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(malformed("host with empty name".to_string()));
            }
            let raw_pwwn = entry.pwwn.get(&self.fabric).ok_or_else(|| {
                malformed(format!("host '{name}' has no pwwn for fabric '{}'", self.fabric))
            })?;
            let pwwn: Pwwn = raw_pwwn
                .parse()
                .map_err(|err| malformed(format!("host '{name}': {err}")))?;
            let role = match entry.role.as_deref() {
                None => Role::Initiator,
                Some(raw) => Role::parse_keyword(raw)
                    .ok_or_else(|| malformed(format!("host '{name}': unknown role '{raw}'")))?,
            };

            builder.add_host(name, pwwn, role).map_err(|err| match err {
                IntentLoadError::DuplicateHost { host } => {
                    malformed(format!("host '{host}' is declared more than once"))
                }
                other => other,
            })?;

            for zone in &entry.zones {
                let zone = zone.trim();
                if zone.is_empty() {
                    return Err(malformed(format!("host '{name}' lists an empty zone name")));
                }
                builder.add_zone_member(zone, name);
            }
        }

        let intent = builder.build()?;
        debug!(
            path = %path.display(),
            fabric = %self.fabric,
            hosts = intent.hosts().len(),
            zones = intent.zones().len(),
            "loaded intent"
        );
        Ok(intent)
    }
}

impl IntentSource for TomlIntentSource {
    fn load(&self, identifier: &str) -> Result<ZoningIntent, IntentLoadError> {
        self.load_path(Path::new(identifier))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IntentFile {
    #[serde(default)]
    host: Vec<HostEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostEntry {
    name: String,
    #[serde(default)]
    zones: Vec<String>,
    role: Option<String>,
    #[serde(default)]
    pwwn: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::{IntentLoadError, IntentSource, TomlIntentSource, ZoningIntent};
    use crate::model::{Pwwn, Role};

    const INTENT: &str = r#"
[[host]]
name = "esx01"
zones = ["Z_PROD", "Z_BACKUP"]
[host.pwwn]
fabric_a = "10:00:00:00:c9:aa:bb:01"
fabric_b = "10:00:00:00:c9:aa:bb:02"

[[host]]
name = "vnx_spa0"
zones = ["Z_PROD"]
role = "target"
[host.pwwn]
fabric_a = "50:06:01:60:3e:a0:12:34"
fabric_b = "50:06:01:61:3e:a0:12:34"
"#;

    fn pwwn(raw: &str) -> Pwwn {
        raw.parse().expect("pwwn")
    }

    #[test]
    fn loads_hosts_and_zones_for_one_fabric() {
        let intent = TomlIntentSource::new("fabric_b")
            .from_toml_str(INTENT, Path::new("inline.toml"))
            .expect("intent");

        assert_eq!(intent.fabric(), "fabric_b");
        let esx = intent.host("esx01").expect("esx01");
        assert_eq!(esx.pwwn, pwwn("10:00:00:00:c9:aa:bb:02"));
        assert_eq!(esx.role, Role::Initiator);
        assert_eq!(intent.host("vnx_spa0").map(|h| h.role), Some(Role::Target));

        let zones: Vec<(&str, Vec<&str>)> = intent
            .zones()
            .iter()
            .map(|z| (z.name.as_str(), z.hosts.iter().map(String::as_str).collect()))
            .collect();
        assert_eq!(
            zones,
            vec![
                ("Z_PROD", vec!["esx01", "vnx_spa0"]),
                ("Z_BACKUP", vec!["esx01"]),
            ]
        );
    }

    #[test]
    fn missing_fabric_pwwn_is_malformed() {
        let err = TomlIntentSource::new("fabric_c")
            .from_toml_str(INTENT, Path::new("inline.toml"))
            .expect_err("no fabric_c");
        match err {
            IntentLoadError::Malformed { reason, .. } => assert!(reason.contains("fabric_c")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_host_and_bad_pwwn_are_malformed() {
        let dup = r#"
[[host]]
name = "h1"
pwwn = { fabric_a = "10:00:00:00:00:00:00:01" }
[[host]]
name = "h1"
pwwn = { fabric_a = "10:00:00:00:00:00:00:02" }
"#;
        let err = TomlIntentSource::new("fabric_a")
            .from_toml_str(dup, Path::new("dup.toml"))
            .expect_err("duplicate");
        assert!(matches!(err, IntentLoadError::Malformed { .. }));

        let bad = "[[host]]\nname = \"h1\"\npwwn = { fabric_a = \"not-a-wwn\" }\n";
        let err = TomlIntentSource::new("fabric_a")
            .from_toml_str(bad, Path::new("bad.toml"))
            .expect_err("bad pwwn");
        assert!(matches!(err, IntentLoadError::Malformed { .. }));
    }

    #[test]
    fn missing_file_is_distinguishable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = TomlIntentSource::new("fabric_a")
            .load(missing.to_str().expect("utf-8 path"))
            .expect_err("missing");
        assert!(err.is_not_found());

        let present = dir.path().join("hosts.toml");
        fs::write(&present, INTENT).expect("write intent");
        let intent = TomlIntentSource::new("fabric_a")
            .load_path(&present)
            .expect("intent");
        assert_eq!(intent.hosts().len(), 2);
    }

    #[test]
    fn builder_rejects_zone_with_undeclared_host() {
        let mut builder = ZoningIntent::builder("fabric_a");
        builder
            .add_host("h1", pwwn("10:00:00:00:00:00:00:01"), Role::Initiator)
            .expect("h1");
        builder.add_zone_member("Z1", "h1").add_zone_member("Z1", "h2");

        match builder.build().expect_err("h2 unknown") {
            IntentLoadError::UnknownHost { zone, host } => {
                assert_eq!((zone.as_str(), host.as_str()), ("Z1", "h2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn repeated_zone_membership_is_collapsed() {
        let mut builder = ZoningIntent::builder("fabric_a");
        builder
            .add_host("h1", pwwn("10:00:00:00:00:00:00:01"), Role::Initiator)
            .expect("h1");
        builder.add_zone_member("Z1", "h1").add_zone_member("Z1", "h1");
        let intent = builder.build().expect("intent");
        assert_eq!(intent.zones()[0].hosts, vec!["h1".to_string()]);
    }
}
