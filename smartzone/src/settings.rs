//! Tool settings loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file) is valid.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::ContinuationPolicy;

/// Fabric-level zone size limits.
///
/// The preferred number of members per zone is 2 and the maximum recommended
/// limit is 50 (MDS 9000 fabric-level configuration limits).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemberLimits {
    pub max_members: usize,
    pub preferred_members: usize,
}

impl Default for MemberLimits {
    fn default() -> Self {
        Self {
            max_members: 50,
            preferred_members: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSettings {
    pub command_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub close_timeout_secs: u64,
    pub continuation_markers: Vec<String>,
    pub continuation: ContinuationPolicy,
    pub confirm: String,
    pub decline: String,
    /// Matched against the last line of output, trailing whitespace removed.
    pub prompt_pattern: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            connect_timeout_secs: 20,
            close_timeout_secs: 5,
            continuation_markers: vec!["want to continue".to_string(), "(y/n)".to_string()],
            continuation: ContinuationPolicy::Confirm,
            confirm: "y".to_string(),
            decline: "n".to_string(),
            prompt_pattern: r"^[\w.\-]+(\([\w.\-]+\))?#$".to_string(),
        }
    }
}

impl SessionSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshSettings {
    pub port: u16,
    /// Refuse servers whose key is not in `~/.ssh/known_hosts`.
    pub strict_host_keys: bool,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            strict_host_keys: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub limits: MemberLimits,
    pub session: SessionSettings,
    pub ssh: SshSettings,
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid settings in {path}: {reason}")]
    Invalid { path: String, reason: String },
}

impl Settings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, path.display().to_string())
    }

    pub fn from_toml_str(raw: &str, path: String) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(raw).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;
        settings
            .validate()
            .map_err(|reason| SettingsError::Invalid { path, reason })?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.limits.max_members == 0 {
            return Err("limits.max_members must be at least 1".to_string());
        }
        if self.limits.preferred_members > self.limits.max_members {
            return Err("limits.preferred_members exceeds limits.max_members".to_string());
        }
        if self.session.command_timeout_secs == 0
            || self.session.connect_timeout_secs == 0
            || self.session.close_timeout_secs == 0
        {
            return Err("session timeouts must be greater than zero".to_string());
        }
        if self.session.continuation_markers.iter().all(|m| m.trim().is_empty()) {
            return Err("session.continuation_markers must name at least one marker".to_string());
        }
        if let Err(err) = regex::Regex::new(&self.session.prompt_pattern) {
            return Err(format!("session.prompt_pattern: {err}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Settings, SettingsError};
    use crate::session::ContinuationPolicy;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("", "inline".to_string()).expect("defaults");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.limits.max_members, 50);
        assert_eq!(settings.limits.preferred_members, 2);
        assert_eq!(settings.session.continuation, ContinuationPolicy::Confirm);
    }

    #[test]
    fn loads_partial_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("smartzone.toml");
        fs::write(
            &path,
            r#"
[limits]
max_members = 20

[session]
command_timeout_secs = 5
continuation = "fail"
"#,
        )
        .expect("write settings");

        let settings = Settings::load(&path).expect("settings should parse");
        assert_eq!(settings.limits.max_members, 20);
        assert_eq!(settings.limits.preferred_members, 2);
        assert_eq!(settings.session.command_timeout_secs, 5);
        assert_eq!(settings.session.continuation, ContinuationPolicy::Fail);
        assert_eq!(settings.ssh.port, 22);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_limits() {
        let err = Settings::from_toml_str("[limits]\nmax = 3\n", "inline".into())
            .expect_err("unknown key");
        assert!(matches!(err, SettingsError::Parse { .. }));

        let err = Settings::from_toml_str("[limits]\nmax_members = 0\n", "inline".into())
            .expect_err("zero limit");
        match err {
            SettingsError::Invalid { reason, .. } => assert!(reason.contains("max_members")),
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn rejects_every_zero_timeout() {
        for key in ["command_timeout_secs", "connect_timeout_secs", "close_timeout_secs"] {
            let raw = format!("[session]\n{key} = 0\n");
            let err = Settings::from_toml_str(&raw, "inline".into()).expect_err(key);
            match err {
                SettingsError::Invalid { reason, .. } => assert!(reason.contains("timeouts")),
                other => panic!("unexpected error variant for {key}: {other}"),
            }
        }
    }

    #[test]
    fn ssh_section_sets_port_and_host_key_policy() {
        let settings =
            Settings::from_toml_str("[ssh]\nport = 2222\nstrict_host_keys = true\n", "inline".into())
                .expect("ssh settings");
        assert_eq!(settings.ssh.port, 2222);
        assert!(settings.ssh.strict_host_keys);
    }

    #[test]
    fn rejects_broken_prompt_pattern() {
        let err = Settings::from_toml_str("[session]\nprompt_pattern = \"([\"\n", "inline".into())
            .expect_err("bad regex");
        assert!(matches!(err, SettingsError::Invalid { .. }));
    }
}
