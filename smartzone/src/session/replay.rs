use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{find_marker, ContinuationPolicy, SessionTransport, TransportError};

/// One recorded command and the switch output it produced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exchange {
    pub command: String,
    #[serde(default)]
    pub response: String,
    /// Simulate a transport timeout instead of answering.
    #[serde(default)]
    pub timeout: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Transcript {
    #[serde(default)]
    exchange: Vec<Exchange>,
}

/// Session that answers commands from a recorded transcript.
///
/// Transcript format:
///
/// ```toml
/// [[exchange]]
/// command = "show zoneset brief vsan 10"
/// response = """
/// zoneset name ZS_FABRIC_A vsan 10
///   zone Z_ESX_PROD
/// """
/// ```
///
/// A recorded response that contains a continuation marker is treated as if
/// the switch asked for confirmation.
#[derive(Debug, Clone)]
pub struct ReplaySession {
    exchanges: Vec<Exchange>,
    markers: Vec<String>,
    sent: Vec<String>,
    closed: bool,
}

impl ReplaySession {
    pub fn new(exchanges: Vec<Exchange>, markers: Vec<String>) -> Self {
        Self {
            exchanges,
            markers,
            sent: Vec::new(),
            closed: false,
        }
    }

    /// Load a TOML transcript from disk.
    pub fn from_transcript(path: &Path, markers: Vec<String>) -> Result<Self, TransportError> {
        let raw = fs::read_to_string(path).map_err(|err| TransportError::Transcript {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let transcript: Transcript =
            toml::from_str(&raw).map_err(|err| TransportError::Transcript {
                path: PathBuf::from(path),
                reason: err.to_string(),
            })?;
        debug!(path = %path.display(), exchanges = transcript.exchange.len(), "loaded transcript");
        Ok(Self::new(transcript.exchange, markers))
    }

    /// Commands sent so far, in order (continuation answers excluded).
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl SessionTransport for ReplaySession {
    fn send_command(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
    ) -> Result<String, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(command.to_string());

        let exchange = self
            .exchanges
            .iter()
            .find(|e| e.command.trim() == command.trim())
            .ok_or_else(|| TransportError::UnexpectedCommand(command.to_string()))?;

        if exchange.timeout {
            return Err(TransportError::Timeout {
                command: command.to_string(),
                waited: Duration::ZERO,
            });
        }

        if let Some((_, marker)) = find_marker(&exchange.response, &self.markers) {
            if policy == ContinuationPolicy::Fail {
                return Err(TransportError::UnexpectedPrompt {
                    command: command.to_string(),
                    marker: marker.to_string(),
                });
            }
            debug!(command, marker, ?policy, "replaying continuation answer");
        }

        Ok(exchange.response.clone())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Exchange, ReplaySession};
    use crate::session::{ContinuationPolicy, SessionTransport, TransportError};

    fn markers() -> Vec<String> {
        vec!["want to continue".to_string()]
    }

    #[test]
    fn answers_recorded_commands_and_tracks_them() {
        let mut session = ReplaySession::new(
            vec![Exchange {
                command: "show zoneset brief vsan 10".into(),
                response: "zoneset name ZS vsan 10\n".into(),
                timeout: false,
            }],
            markers(),
        );

        let out = session
            .send_command("show zoneset brief vsan 10", ContinuationPolicy::Confirm)
            .expect("recorded");
        assert_eq!(out, "zoneset name ZS vsan 10\n");

        let err = session
            .send_command("show zone name Z9", ContinuationPolicy::Confirm)
            .expect_err("unrecorded");
        assert!(matches!(err, TransportError::UnexpectedCommand(_)));
        assert_eq!(session.sent(), ["show zoneset brief vsan 10", "show zone name Z9"]);

        session.close().expect("close");
        assert!(session.is_closed());
        assert!(matches!(
            session.send_command("show zoneset brief vsan 10", ContinuationPolicy::Confirm),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn loads_transcript_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("transcript.toml");
        fs::write(
            &path,
            r#"
[[exchange]]
command = "show device-alias database"
response = """
device-alias name H1 pwwn 10:00:00:00:00:00:00:01
"""

[[exchange]]
command = "show zone name Z1"
timeout = true
"#,
        )
        .expect("write transcript");

        let mut session = ReplaySession::from_transcript(&path, markers()).expect("transcript");
        assert!(session
            .send_command("show device-alias database", ContinuationPolicy::Confirm)
            .expect("db")
            .contains("H1"));
        assert!(matches!(
            session.send_command("show zone name Z1", ContinuationPolicy::Confirm),
            Err(TransportError::Timeout { .. })
        ));
    }

    #[test]
    fn broken_transcript_is_a_transcript_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[[exchange]]\ncommand = ").expect("write");

        let err = ReplaySession::from_transcript(&path, markers()).expect_err("broken");
        assert!(matches!(err, TransportError::Transcript { .. }));
    }

    #[test]
    fn recorded_prompt_respects_fail_policy() {
        let mut session = ReplaySession::new(
            vec![Exchange {
                command: "zoneset activate name ZS vsan 10".into(),
                response: "Do you want to continue? (y/n) [n] y\n".into(),
                timeout: false,
            }],
            markers(),
        );
        assert!(session
            .send_command("zoneset activate name ZS vsan 10", ContinuationPolicy::Confirm)
            .is_ok());
        assert!(matches!(
            session.send_command("zoneset activate name ZS vsan 10", ContinuationPolicy::Fail),
            Err(TransportError::UnexpectedPrompt { .. })
        ));
    }
}
