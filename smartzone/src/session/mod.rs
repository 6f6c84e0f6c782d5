//! Command sessions against a switch CLI.
//!
//! The validation engine only talks to [`SessionTransport`]. Two transports
//! ship with the crate:
//!
//! - [`SshSession`] opens an interactive shell over SSH (russh)
//! - [`ReplaySession`] answers from a recorded transcript (offline checks)
//!
//! Both honour a [`ContinuationPolicy`] when a command stops to ask for
//! confirmation (`Do you want to continue? (y/n)`).

mod interactive;
mod replay;
mod ssh;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use interactive::{Interaction, Shell};
pub use replay::ReplaySession;
pub use ssh::{SshAuth, SshOptions, SshSession};

/// What to do when a response stops at a continuation prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuationPolicy {
    /// Answer with the confirmation string and keep reading.
    #[default]
    Confirm,
    /// Answer with the decline string and keep reading.
    Decline,
    /// Abort the command with [`TransportError::UnexpectedPrompt`].
    Fail,
}

/// Transport-level failures. Any of these aborts a validation run.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The async runtime backing the SSH client could not be built.
    #[error("failed to start ssh runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Protocol or network failure reported by the SSH client.
    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),

    /// A private key could not be loaded.
    #[error("failed to load key {path}: {source}")]
    Key {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },

    /// Key authentication was requested but no key file exists.
    #[error("no private key found (pass --key-file)")]
    NoKey,

    /// The server rejected every offered credential.
    #[error("authentication failed for user {user}")]
    Authentication { user: String },

    /// The server host key is not trusted.
    #[error("host key for {host} rejected: {reason}")]
    HostKey { host: String, reason: String },

    /// The remote side closed the session.
    #[error("session closed by remote side")]
    Closed,

    /// No complete response arrived before the deadline.
    #[error("timed out after {waited:?} waiting for response to '{command}'")]
    Timeout { command: String, waited: Duration },

    /// A continuation prompt appeared while the policy forbids answering it.
    #[error("'{command}' asked for confirmation ('{marker}')")]
    UnexpectedPrompt { command: String, marker: String },

    /// A replay transcript has no response recorded for this command.
    #[error("no recorded response for '{0}'")]
    UnexpectedCommand(String),

    /// A replay transcript could not be loaded.
    #[error("failed to load transcript {path}: {reason}")]
    Transcript { path: PathBuf, reason: String },

    /// The configured prompt pattern is not a valid regular expression.
    #[error("invalid prompt pattern: {0}")]
    InvalidPrompt(#[from] regex::Error),
}

/// A single interactive CLI session.
///
/// Commands run strictly one after another: `send_command` returns only after
/// the full response, including any continuation exchange, has been read.
pub trait SessionTransport {
    /// Send one command and return its output without the echo and prompt.
    fn send_command(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
    ) -> Result<String, TransportError>;

    /// Disconnect. Calling `close` on a closed session is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<T: SessionTransport + ?Sized> SessionTransport for Box<T> {
    fn send_command(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
    ) -> Result<String, TransportError> {
        (**self).send_command(command, policy)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Return the earliest marker in `output` with its byte offset, ignoring
/// ASCII case.
pub(crate) fn find_marker<'m>(output: &str, markers: &'m [String]) -> Option<(usize, &'m str)> {
    let haystack = output.to_ascii_lowercase();
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .filter_map(|m| {
            haystack
                .find(&m.to_ascii_lowercase())
                .map(|at| (at, m.as_str()))
        })
        .min_by_key(|(at, _)| *at)
}
