//! The configured SSH client and the sessions it opens.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use russh::client::{self, Handle, Msg};
use russh::{Channel, Disconnect};

use super::verify::HostKeyVerifier;
use crate::error::{Result, TransportError};
use crate::identity::{self, AuthPreference, Identity, IdentityRepository};

/// A remote endpoint as the embedding Git layer names it.
///
/// `new` accepts the `user@host` form common in Git remote URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub name: String,
    pub port: u16,
    pub user: Option<String>,
}

impl RemoteHost {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.split_once('@') {
            Some((user, host)) if !user.is_empty() => Self {
                name: host.to_string(),
                port: 22,
                user: Some(user.to_string()),
            },
            _ => Self {
                name,
                port: 22,
                user: None,
            },
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Per-connection overrides, passed through the factory's configure hook.
///
/// The factory leaves these untouched; they exist so the embedding transport
/// layer can apply its own per-host policy if it has one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub connect_timeout: Option<Duration>,
}

/// A fully configured SSH client, produced by the session factory.
///
/// Plain data until [`SshClient::connect`] is called: nothing is validated,
/// no socket is opened, and the factory hands it to the transport layer
/// exactly once. Each client owns its configuration; nothing here is
/// process-global.
#[derive(Debug, Clone)]
pub struct SshClient {
    identity_repository: IdentityRepository,
    identity: Option<Identity>,
    known_hosts: Option<PathBuf>,
    auth_preference: AuthPreference,
    timeout: Duration,
}

impl Default for SshClient {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SshClient {
    /// Client with library defaults: local-key identity repository, default
    /// known-hosts location, no auth restriction.
    pub fn with_defaults() -> Self {
        Self {
            identity_repository: IdentityRepository::Default,
            identity: None,
            known_hosts: None,
            auth_preference: AuthPreference::Default,
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn set_identity_repository(&mut self, repository: IdentityRepository) {
        self.identity_repository = repository;
    }

    pub(crate) fn set_auth_preference(&mut self, preference: AuthPreference) {
        self.auth_preference = preference;
    }

    pub(crate) fn set_known_hosts(&mut self, path: PathBuf) {
        self.known_hosts = Some(path);
    }

    pub(crate) fn add_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn identity_repository(&self) -> &IdentityRepository {
        &self.identity_repository
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn known_hosts(&self) -> Option<&Path> {
        self.known_hosts.as_deref()
    }

    pub fn auth_preference(&self) -> AuthPreference {
        self.auth_preference
    }

    /// Connect to `host`, verify its key, and authenticate.
    pub async fn connect(
        &self,
        host: &RemoteHost,
        settings: &SessionSettings,
    ) -> Result<SshSession> {
        let port = settings.port.unwrap_or(host.port);
        let user = effective_user(host, settings)?;
        let timeout = settings.connect_timeout.unwrap_or(self.timeout);

        let config = Arc::new(client::Config {
            inactivity_timeout: Some(self.timeout),
            ..Default::default()
        });

        let error_slot: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));
        let verifier = HostKeyVerifier::new(
            host.name.clone(),
            port,
            self.known_hosts.clone(),
            error_slot.clone(),
        );

        let mut handle = tokio::time::timeout(
            timeout,
            client::connect(config, (host.name.as_str(), port), verifier),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| {
            // Surface the verifier's detailed error instead of the
            // generic russh::Error::UnknownKey.
            match error_slot.lock().unwrap().take() {
                Some(host_key_error) => host_key_error,
                None => TransportError::Ssh(e),
            }
        })?;

        identity::authenticate(
            &mut handle,
            &user,
            &self.identity_repository,
            self.identity.as_ref(),
        )
        .await?;

        Ok(SshSession { handle })
    }
}

fn effective_user(
    host: &RemoteHost,
    settings: &SessionSettings,
) -> std::result::Result<String, TransportError> {
    settings
        .user
        .clone()
        .or_else(|| host.user.clone())
        .ok_or_else(|| TransportError::MissingUsername {
            host: host.name.clone(),
        })
}

/// An established, authenticated session.
pub struct SshSession {
    handle: Handle<HostKeyVerifier>,
}

impl SshSession {
    /// Open a channel running `command` on the remote side.
    ///
    /// This is what a Git transport needs to start `git-upload-pack` or
    /// `git-receive-pack`; the caller drives the channel's data flow.
    pub async fn open_exec_channel(&self, command: &str) -> Result<Channel<Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .exec(true, command)
            .await
            .map_err(TransportError::Ssh)?;
        Ok(channel)
    }

    /// Whether the underlying connection is still open.
    pub fn is_alive(&self) -> bool {
        !self.handle.is_closed()
    }

    /// Disconnect cleanly.
    pub async fn close(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_host_parses_user_at_host() {
        let host = RemoteHost::new("git@forge.example.com");
        assert_eq!(host.name, "forge.example.com");
        assert_eq!(host.user.as_deref(), Some("git"));
        assert_eq!(host.port, 22);
    }

    #[test]
    fn test_remote_host_without_user() {
        let host = RemoteHost::new("forge.example.com").port(2222);
        assert_eq!(host.name, "forge.example.com");
        assert_eq!(host.user, None);
        assert_eq!(host.port, 2222);
    }

    #[test]
    fn test_effective_user_prefers_settings_override() {
        let host = RemoteHost::new("git@forge.example.com");
        let settings = SessionSettings {
            user: Some("deploy".into()),
            ..Default::default()
        };
        assert_eq!(effective_user(&host, &settings).unwrap(), "deploy");
        assert_eq!(
            effective_user(&host, &SessionSettings::default()).unwrap(),
            "git"
        );
    }

    #[test]
    fn test_effective_user_missing_is_an_error() {
        let host = RemoteHost::new("forge.example.com");
        match effective_user(&host, &SessionSettings::default()) {
            Err(TransportError::MissingUsername { host }) => {
                assert_eq!(host, "forge.example.com");
            }
            other => panic!("expected MissingUsername, got {other:?}"),
        }
    }

    #[test]
    fn test_default_client_has_no_overrides() {
        let client = SshClient::with_defaults();
        assert!(!client.identity_repository().is_agent());
        assert!(client.identity().is_none());
        assert!(client.known_hosts().is_none());
        assert_eq!(client.auth_preference(), AuthPreference::Default);
    }

    #[tokio::test]
    async fn test_connect_times_out_on_silent_listener() {
        // A TCP listener that never speaks the SSH version exchange.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = SshClient::with_defaults();
        let host = RemoteHost::new("release@127.0.0.1").port(port);
        let settings = SessionSettings {
            connect_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };

        match client.connect(&host, &settings).await {
            Err(crate::error::Error::Transport(TransportError::Timeout(_))) => {}
            other => panic!("expected Timeout, got {:?}", other.err()),
        }
    }
}
