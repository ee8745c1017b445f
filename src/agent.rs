//! SSH agent discovery.
//!
//! An agent is an optional environmental facility: when one is reachable the
//! session factory prefers it for public-key authentication, and when it is
//! not the factory carries on without it. Discovery therefore never produces
//! a bare `None`; it yields either a connector handle or a typed
//! [`AgentError`] naming why the agent is out of reach, so callers decide
//! explicitly how to degrade.

use std::env;
use std::path::{Path, PathBuf};

use russh::keys::agent::client::AgentClient;
use tokio::net::UnixStream;

use crate::error::AgentError;

/// Environment variable conventionally carrying the agent socket path.
pub const SSH_AUTH_SOCK: &str = "SSH_AUTH_SOCK";

/// Handle to a reachable SSH agent.
///
/// Construction goes through [`AgentConnector::discover`], which probes the
/// socket synchronously so an unreachable agent fails at discovery time, not
/// in the middle of authentication. The handle itself is inert: the async
/// protocol client is opened on demand by [`AgentConnector::client`].
#[derive(Debug, Clone)]
pub struct AgentConnector {
    socket: PathBuf,
}

impl AgentConnector {
    /// Whether an agent endpoint is advertised in the environment.
    ///
    /// Only checks that `SSH_AUTH_SOCK` is set; reachability is verified by
    /// [`AgentConnector::discover`].
    pub fn is_available() -> bool {
        env::var_os(SSH_AUTH_SOCK).is_some()
    }

    /// Discover the agent advertised by `SSH_AUTH_SOCK`.
    pub fn discover() -> std::result::Result<Self, AgentError> {
        let socket = env::var_os(SSH_AUTH_SOCK)
            .map(PathBuf::from)
            .ok_or(AgentError::EnvUnset)?;
        Self::from_socket(socket)
    }

    /// Build a connector for an explicit socket path.
    ///
    /// A short probe connection verifies the socket exists and accepts
    /// connections. The probe is dropped immediately; the agent serves each
    /// connection independently.
    pub fn from_socket(socket: impl Into<PathBuf>) -> std::result::Result<Self, AgentError> {
        let socket = socket.into();
        match std::os::unix::net::UnixStream::connect(&socket) {
            Ok(_) => Ok(Self { socket }),
            Err(source) => Err(AgentError::Unreachable { socket, source }),
        }
    }

    /// Human-readable identity of this connector, used in factory debug logs.
    pub fn name(&self) -> String {
        format!("ssh-agent at {}", self.socket.display())
    }

    /// Path of the agent's Unix socket.
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Open the agent protocol client used during authentication.
    ///
    /// The agent process owns its own lifecycle; this only opens a stream to
    /// the socket verified at discovery time. The socket may have vanished
    /// since, which surfaces as a protocol-level [`AgentError`].
    pub async fn client(&self) -> std::result::Result<AgentClient<UnixStream>, AgentError> {
        AgentClient::connect_uds(&self.socket)
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))
    }
}
