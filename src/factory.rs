//! The SSH session factory.
//!
//! [`SessionFactory`] is built once per release operation and handed to the
//! Git-over-SSH transport layer, which calls [`SessionConfigurator::configure`]
//! per remote host and [`SessionConfigurator::create_client`] once to obtain
//! the configured client. Agent-backed public-key authentication is preferred
//! when an agent is reachable; everything else is left at library defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;
use serde::Deserialize;

use crate::agent::AgentConnector;
use crate::error::Result;
use crate::identity::{AuthPreference, Identity, IdentityRepository};
use crate::logging::{HostLog, LogBridge};
use crate::transport::{RemoteHost, SessionSettings, SshClient};

/// Extension-point contract consumed by the embedding transport layer.
pub trait SessionConfigurator {
    /// Per-host hook, invoked once per remote host before connecting.
    fn configure(&self, host: &RemoteHost, settings: &mut SessionSettings);

    /// Client-creation hook, invoked once to produce the configured client.
    fn create_client(&self) -> Result<SshClient>;
}

/// Session settings as they appear in the release tool's configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionProfile {
    pub known_hosts: Option<PathBuf>,
    pub identity_file: Option<PathBuf>,
    pub passphrase: Option<SecretString>,
}

/// Session factory preferring ssh-agent authentication.
///
/// Holds the host logger and three optional settings: a known-hosts file, an
/// identity file, and its passphrase. None of the paths are validated here;
/// a bad path surfaces later as a transport error. The passphrase is only
/// ever applied together with the identity file it protects.
pub struct SessionFactory {
    log: Arc<dyn HostLog>,
    known_hosts: Option<PathBuf>,
    identity_file: Option<PathBuf>,
    passphrase: Option<SecretString>,
}

impl SessionFactory {
    pub fn new(log: Arc<dyn HostLog>) -> Self {
        Self {
            log,
            known_hosts: None,
            identity_file: None,
            passphrase: None,
        }
    }

    /// Build a factory from a deserialized [`SessionProfile`].
    pub fn from_profile(log: Arc<dyn HostLog>, profile: SessionProfile) -> Self {
        let mut factory = Self::new(log);
        factory.known_hosts = profile.known_hosts;
        factory.identity_file = profile.identity_file;
        factory.passphrase = profile.passphrase;
        factory
    }

    pub fn with_known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    pub fn with_passphrase(mut self, passphrase: SecretString) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    pub fn known_hosts(&self) -> Option<&Path> {
        self.known_hosts.as_deref()
    }

    pub fn identity_file(&self) -> Option<&Path> {
        self.identity_file.as_deref()
    }

    pub fn passphrase(&self) -> Option<&SecretString> {
        self.passphrase.as_ref()
    }
}

impl SessionConfigurator for SessionFactory {
    /// Intentionally a no-op: all configuration is global to the client.
    /// Per-host user, port, and proxy overrides are out of scope.
    fn configure(&self, _host: &RemoteHost, _settings: &mut SessionSettings) {}

    fn create_client(&self) -> Result<SshClient> {
        // Agent discovery is the only soft failure in this sequence: a
        // release can proceed on file-based keys, so an unreachable agent
        // is a warning, never an abort.
        let connector = match AgentConnector::discover() {
            Ok(connector) => Some(connector),
            Err(e) => {
                self.log.warn(&format!("failed to connect to SSH agent: {e}"));
                None
            }
        };

        let mut client = SshClient::with_defaults();

        if let Some(connector) = connector {
            client.set_auth_preference(AuthPreference::PublicKeyOnly);
            self.log
                .debug(&format!("ssh client configured to use {}", connector.name()));
            client.set_identity_repository(IdentityRepository::Agent(connector));
        }

        if let Some(path) = &self.known_hosts {
            client.set_known_hosts(path.clone());
            self.log.debug(&format!(
                "ssh client configured to use known-hosts file {}",
                path.display()
            ));
        }

        if let Some(path) = &self.identity_file {
            client.add_identity(Identity {
                path: path.clone(),
                passphrase: self.passphrase.clone(),
            });
            self.log.debug(&format!(
                "ssh client configured to use identity file {}",
                path.display()
            ));
        }

        LogBridge::install(self.log.clone());

        Ok(client)
    }
}
