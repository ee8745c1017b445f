//! SSH transport layer wrapping russh.
//!
//! This module holds the configured client context the session factory
//! produces, the connection and authentication path, and server host key
//! verification against known-hosts.

mod client;
mod verify;

pub use client::{RemoteHost, SessionSettings, SshClient, SshSession};
