use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, trace};

use super::{find_marker, ContinuationPolicy, TransportError};
use crate::settings::SessionSettings;

/// Byte-level access to an interactive shell.
pub trait Shell {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `wait` for the next chunk of output.
    ///
    /// `Ok(None)` means nothing arrived in time. A shell closed by the remote
    /// side is [`TransportError::Closed`].
    fn read_chunk(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Prompt-driven command/response exchange over a [`Shell`].
///
/// Every read is bounded by a deadline instead of a fixed delay. A response
/// is complete once the last output line matches the device prompt.
pub struct Interaction<S: Shell> {
    shell: S,
    prompt: Regex,
    settings: SessionSettings,
}

impl<S: Shell> Interaction<S> {
    pub fn new(shell: S, settings: SessionSettings) -> Result<Self, TransportError> {
        let prompt = Regex::new(&settings.prompt_pattern)?;
        Ok(Self {
            shell,
            prompt,
            settings,
        })
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    /// Read until the first prompt appears, returning the banner text.
    pub fn wait_for_prompt(&mut self, timeout: Duration) -> Result<String, TransportError> {
        self.collect("<login>", ContinuationPolicy::Fail, timeout)
    }

    /// Send `command` and read its full response.
    pub fn execute(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
    ) -> Result<String, TransportError> {
        debug!(command, "sending command");
        self.send_line(command)?;
        let raw = self.collect(command, policy, self.settings.command_timeout())?;
        Ok(strip_echo_and_prompt(&raw, command))
    }

    /// Send a line without waiting for a response.
    pub fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.shell.write_all(&bytes)
    }

    fn collect(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut raw = Vec::new();
        // start of the last line holding an answered continuation prompt
        let mut answered_line = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout {
                    command: command.to_string(),
                    waited: started.elapsed(),
                });
            }

            let Some(chunk) = self.shell.read_chunk(remaining)? else {
                continue;
            };
            trace!(bytes = chunk.len(), "received chunk");
            raw.extend_from_slice(&chunk);

            let text = settled_text(&raw);
            let from = unanswered_from(&text, answered_line);
            if let Some((at, marker)) =
                find_marker(&text[from..], &self.settings.continuation_markers)
            {
                answered_line = Some(line_start(&text, from + at));
                let answer = match policy {
                    ContinuationPolicy::Confirm => self.settings.confirm.clone(),
                    ContinuationPolicy::Decline => self.settings.decline.clone(),
                    ContinuationPolicy::Fail => {
                        return Err(TransportError::UnexpectedPrompt {
                            command: command.to_string(),
                            marker: marker.to_string(),
                        })
                    }
                };
                debug!(command, marker, answer = %answer, "answering continuation prompt");
                self.send_line(&answer)?;
                continue;
            }

            if self.at_prompt(&text) {
                return Ok(String::from_utf8_lossy(&raw).replace('\r', ""));
            }
        }
    }

    fn at_prompt(&self, text: &str) -> bool {
        let last = text.rsplit('\n').next().unwrap_or("");
        self.prompt.is_match(last.trim())
    }
}

/// Decode `raw` without carriage returns, leaving out a multibyte character
/// that is still cut off at the end.
fn settled_text(raw: &[u8]) -> String {
    let complete = match std::str::from_utf8(raw) {
        Err(err) if err.error_len().is_none() => &raw[..err.valid_up_to()],
        _ => raw,
    };
    String::from_utf8_lossy(complete).replace('\r', "")
}

/// Where the marker search resumes. Text on an already answered prompt line
/// is never searched again, however many reads the prompt was split across.
fn unanswered_from(text: &str, answered_line: Option<usize>) -> usize {
    match answered_line {
        None => 0,
        Some(start) => text[start..]
            .find('\n')
            .map_or(text.len(), |nl| start + nl + 1),
    }
}

fn line_start(text: &str, at: usize) -> usize {
    text[..at].rfind('\n').map_or(0, |nl| nl + 1)
}

/// Drop the echoed command line and the trailing prompt line.
fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.split('\n').collect();
    lines.pop();

    let start = lines
        .iter()
        .position(|line| line.trim_end().ends_with(command))
        .map_or(0, |idx| idx + 1);

    let mut out = lines[start..].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
