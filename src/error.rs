//! Error types for relssh.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for relssh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH agent errors (recoverable: the session factory downgrades
    /// these to warnings and continues without agent authentication)
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// SSH transport-level errors (fatal: propagated to the caller)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// SSH agent discovery and protocol errors.
///
/// Every variant is an expected condition: an agent is an optional
/// environmental facility, and its absence must not abort client creation.
#[derive(Error, Debug)]
pub enum AgentError {
    /// SSH_AUTH_SOCK is not set in the environment
    #[error("SSH_AUTH_SOCK is not set, no agent endpoint to connect to")]
    EnvUnset,

    /// The agent socket does not exist or refused the connection
    #[error("agent socket {} is unreachable: {source}", socket.display())]
    Unreachable {
        socket: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The agent answered but the protocol exchange failed
    #[error("agent protocol failure: {0}")]
    Protocol(String),
}

/// Transport layer errors (SSH connection, host verification, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// No username available for authentication
    #[error("no username for {host}: not in the remote address and not overridden")]
    MissingUsername { host: String },

    /// Every offered identity was rejected
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// An identity file could not be loaded or decrypted
    #[error("cannot load identity file {}: {reason}", path.display())]
    KeyLoad { path: PathBuf, reason: String },

    /// Known-hosts file could not be read or parsed
    #[error("known-hosts failure: {0}")]
    KnownHosts(String),

    /// The server key does not match the recorded one
    #[error("host key for {host}:{port} changed (known-hosts line {line}); refusing to connect")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using relssh's Error.
pub type Result<T> = std::result::Result<T, Error>;
