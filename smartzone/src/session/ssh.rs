use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Handle};
use russh::keys::ssh_key::PublicKey;
use russh::keys::{check_known_hosts, load_secret_key, PrivateKeyWithHashAlg};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::runtime::{Builder, Runtime};
use tokio::time;
use tracing::{debug, info, trace, warn};

use super::interactive::{Interaction, Shell};
use super::{ContinuationPolicy, SessionTransport, TransportError};
use crate::commands;
use crate::settings::{SessionSettings, SshSettings};

/// How the session logs in.
#[derive(Clone, PartialEq, Eq)]
pub enum SshAuth {
    Password(String),
    /// Public key login. `None` uses the first default identity under `~/.ssh`.
    Key(Option<PathBuf>),
}

impl SshAuth {
    /// An explicit password wins over `env_password`. Key login is used when
    /// keys are forced or no non-empty password is available.
    pub fn resolve(
        password: Option<&str>,
        env_password: Option<&str>,
        use_keys: bool,
        key_file: Option<PathBuf>,
    ) -> Self {
        if use_keys {
            return SshAuth::Key(key_file);
        }
        match password
            .into_iter()
            .chain(env_password)
            .find(|value| !value.is_empty())
        {
            Some(password) => SshAuth::Password(password.to_string()),
            None => SshAuth::Key(key_file),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            SshAuth::Password(_) => "password",
            SshAuth::Key(_) => "key",
        }
    }
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshAuth::Password(_) => f.write_str("Password(***)"),
            SshAuth::Key(path) => f.debug_tuple("Key").field(path).finish(),
        }
    }
}

/// Connection parameters for [`SshSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    /// Require the server key to be listed in `~/.ssh/known_hosts`.
    pub strict_host_keys: bool,
}

impl SshOptions {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        auth: SshAuth,
        ssh: &SshSettings,
    ) -> Self {
        Self {
            host: host.into(),
            port: ssh.port,
            username: username.into(),
            auth,
            strict_host_keys: ssh.strict_host_keys,
        }
    }
}

struct HostKeyCheck {
    host: String,
    port: u16,
    strict: bool,
}

impl client::Handler for HostKeyCheck {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        if !self.strict {
            debug!(host = %self.host, "accepting server host key");
            return Ok(true);
        }
        match check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) => Err(TransportError::HostKey {
                host: self.host.clone(),
                reason: "not listed in known_hosts".to_string(),
            }),
            Err(err) => Err(TransportError::HostKey {
                host: self.host.clone(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Interactive shell channel of an SSH connection, driven from blocking code
/// through a single-threaded runtime.
struct RusshShell {
    runtime: Runtime,
    handle: Handle<HostKeyCheck>,
    channel: Channel<client::Msg>,
}

impl RusshShell {
    fn disconnect(&mut self, timeout: Duration) {
        let Self {
            runtime, handle, ..
        } = self;
        let closing = handle.disconnect(Disconnect::ByApplication, "", "English");
        match runtime.block_on(time::timeout(timeout, closing)) {
            Ok(Ok(())) => debug!("ssh connection closed"),
            // the switch usually drops the connection itself after `exit`
            Ok(Err(err)) => debug!(error = %err, "disconnect after logout"),
            Err(_) => warn!("ssh disconnect did not finish in {timeout:?}"),
        }
    }
}

impl Shell for RusshShell {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.runtime
            .block_on(self.channel.data(bytes))
            .map_err(TransportError::from)
    }

    fn read_chunk(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match self.runtime.block_on(time::timeout(wait, self.channel.wait())) {
            Err(_) => Ok(None),
            Ok(None | Some(ChannelMsg::Eof | ChannelMsg::Close)) => Err(TransportError::Closed),
            Ok(Some(ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. })) => {
                Ok(Some(data.to_vec()))
            }
            Ok(Some(_)) => {
                trace!("ignoring channel message");
                Ok(Some(Vec::new()))
            }
        }
    }
}

/// Interactive switch shell over SSH.
pub struct SshSession {
    interaction: Option<Interaction<RusshShell>>,
    close_timeout: Duration,
}

impl SshSession {
    /// Log in, wait for the first prompt and disable paging.
    pub fn connect(options: &SshOptions, settings: &SessionSettings) -> Result<Self, TransportError> {
        info!(
            host = %options.host,
            port = options.port,
            user = %options.username,
            auth = options.auth.method(),
            "connecting"
        );
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        let (handle, channel) =
            match runtime.block_on(time::timeout(settings.connect_timeout(), open(options))) {
                Ok(opened) => opened?,
                Err(_) => {
                    return Err(TransportError::Timeout {
                        command: "<connect>".to_string(),
                        waited: settings.connect_timeout(),
                    })
                }
            };

        let shell = RusshShell {
            runtime,
            handle,
            channel,
        };
        let mut interaction = Interaction::new(shell, settings.clone())?;
        interaction.wait_for_prompt(settings.connect_timeout())?;
        interaction.execute(commands::TERMINAL_LENGTH_ZERO, ContinuationPolicy::Fail)?;
        info!(host = %options.host, "session ready");

        Ok(Self {
            interaction: Some(interaction),
            close_timeout: settings.close_timeout(),
        })
    }
}

async fn open(
    options: &SshOptions,
) -> Result<(Handle<HostKeyCheck>, Channel<client::Msg>), TransportError> {
    let config = Arc::new(client::Config::default());
    let check = HostKeyCheck {
        host: options.host.clone(),
        port: options.port,
        strict: options.strict_host_keys,
    };
    let mut handle = client::connect(config, (options.host.as_str(), options.port), check).await?;

    let user = options.username.as_str();
    let auth = match &options.auth {
        SshAuth::Password(password) => handle.authenticate_password(user, password.as_str()).await?,
        SshAuth::Key(path) => {
            let path = match path {
                Some(path) => path.clone(),
                None => default_identity().ok_or(TransportError::NoKey)?,
            };
            debug!(key = %path.display(), "loading private key");
            let key = load_secret_key(&path, None)
                .map_err(|source| TransportError::Key { path, source })?;
            let hash = handle.best_supported_rsa_hash().await?.flatten();
            handle
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash))
                .await?
        }
    };
    if !auth.success() {
        return Err(TransportError::Authentication {
            user: user.to_string(),
        });
    }

    let channel = handle.channel_open_session().await?;
    channel
        .request_pty(false, "vt100", 511, 24, 0, 0, &[])
        .await?;
    channel.request_shell(false).await?;
    Ok((handle, channel))
}

fn default_identity() -> Option<PathBuf> {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"))?;
    let dir = PathBuf::from(home).join(".ssh");
    ["id_ed25519", "id_ecdsa", "id_rsa"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

impl SessionTransport for SshSession {
    fn send_command(
        &mut self,
        command: &str,
        policy: ContinuationPolicy,
    ) -> Result<String, TransportError> {
        match self.interaction.as_mut() {
            Some(interaction) => interaction.execute(command, policy),
            None => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut interaction) = self.interaction.take() else {
            return Ok(());
        };
        if let Err(err) = interaction.send_line("exit") {
            debug!(error = %err, "logout failed");
        }
        interaction.shell_mut().disconnect(self.close_timeout);
        Ok(())
    }
}
