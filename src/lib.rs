//! # Relssh
//!
//! SSH session factory for release tooling that authenticates Git operations
//! (push/fetch over SSH) with keys held by a running ssh-agent, so the
//! release process never handles private-key decryption itself.
//!
//! ## Features
//!
//! - Agent discovery over the `SSH_AUTH_SOCK` Unix socket, with a typed
//!   unavailable marker instead of a silent null
//! - Per-client identity repositories (agent-backed or local key files) and
//!   optional explicit identity file with passphrase
//! - Known-hosts verification via russh, never silently disabled
//! - A logging bridge routing the SSH library's output into the host
//!   application's logger
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relssh::{
//!     RemoteHost, SessionConfigurator, SessionFactory, SessionSettings, StderrLog,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relssh::Error> {
//!     let factory = SessionFactory::new(Arc::new(StderrLog::default()))
//!         .with_known_hosts("/home/release/.ssh/known_hosts");
//!
//!     let client = factory.create_client()?;
//!
//!     let host = RemoteHost::new("git@forge.example.com");
//!     let mut settings = SessionSettings::default();
//!     factory.configure(&host, &mut settings);
//!
//!     let session = client.connect(&host, &settings).await?;
//!     let channel = session
//!         .open_exec_channel("git-upload-pack 'project.git'")
//!         .await?;
//!     // ... drive the pack protocol over `channel` ...
//!     # let _ = channel;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod error;
pub mod factory;
pub mod identity;
pub mod logging;
pub mod transport;

// Re-export main types for convenience
pub use agent::AgentConnector;
pub use error::{AgentError, Error, Result, TransportError};
pub use factory::{SessionConfigurator, SessionFactory, SessionProfile};
pub use identity::{AuthPreference, Identity, IdentityRepository};
pub use logging::{BridgeLevel, HostLog, LogBridge, StderrLog};
pub use transport::{RemoteHost, SessionSettings, SshClient, SshSession};
