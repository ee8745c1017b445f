//! Server host key verification against known-hosts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::warn;
use russh::client;
use russh::keys::PublicKey;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};

use crate::error::TransportError;

/// russh client handler checking server keys against known-hosts.
///
/// With a configured path the check runs against that file; without one it
/// runs against the user's default known-hosts location. Verification is
/// never skipped. Unknown hosts are accepted and recorded (OpenSSH
/// accept-new); a changed key is always rejected.
pub(crate) struct HostKeyVerifier {
    host: String,
    port: u16,
    known_hosts: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    error_slot: Arc<Mutex<Option<TransportError>>>,
}

impl HostKeyVerifier {
    pub(crate) fn new(
        host: String,
        port: u16,
        known_hosts: Option<PathBuf>,
        error_slot: Arc<Mutex<Option<TransportError>>>,
    ) -> Self {
        Self {
            host,
            port,
            known_hosts,
            error_slot,
        }
    }

    /// Check the server key against known-hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if the host is not
    /// recorded, `Err(HostKeyChanged)` if the recorded key differs.
    fn check(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = match &self.known_hosts {
            Some(path) => check_known_hosts_path(&self.host, self.port, key, path),
            None => check_known_hosts(&self.host, self.port, key),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = match &self.known_hosts {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

impl client::Handler for HostKeyVerifier {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.check(server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) => {
                if let Err(e) = self.learn(server_public_key) {
                    warn!(
                        "failed to record host key for {}:{}: {}",
                        self.host, self.port, e
                    );
                }
                Ok(true)
            }
            Err(e) => {
                *self.error_slot.lock().unwrap() = Some(e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ED25519_A: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIPrQwS0dCo0LrdtMX0sV6qP1tJNNWEB4cn+B8DO3yyMT";
    const ED25519_B: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIAt1dC1L2dNaRSFG4PaWOJdGJ1DVs+2XN1vMRNQQX9DM";

    fn parse_key(blob: &str) -> PublicKey {
        use std::str::FromStr;
        PublicKey::from_str(&format!("ssh-ed25519 {blob}")).unwrap()
    }

    fn verifier(known_hosts: &std::path::Path) -> HostKeyVerifier {
        HostKeyVerifier::new(
            "release.example.com".into(),
            22,
            Some(known_hosts.to_path_buf()),
            Arc::new(Mutex::new(None)),
        )
    }

    #[test]
    fn test_recorded_key_matches() {
        let dir = tempfile::tempdir().unwrap();
        let kh = dir.path().join("known_hosts");
        let mut f = std::fs::File::create(&kh).unwrap();
        writeln!(f, "release.example.com ssh-ed25519 {ED25519_A}").unwrap();

        assert!(verifier(&kh).check(&parse_key(ED25519_A)).unwrap());
    }

    #[test]
    fn test_unrecorded_host_is_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        let kh = dir.path().join("known_hosts");
        std::fs::File::create(&kh).unwrap();

        assert!(!verifier(&kh).check(&parse_key(ED25519_A)).unwrap());
    }

    #[test]
    fn test_changed_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let kh = dir.path().join("known_hosts");
        let mut f = std::fs::File::create(&kh).unwrap();
        writeln!(f, "release.example.com ssh-ed25519 {ED25519_A}").unwrap();

        match verifier(&kh).check(&parse_key(ED25519_B)) {
            Err(TransportError::HostKeyChanged { host, port, .. }) => {
                assert_eq!(host, "release.example.com");
                assert_eq!(port, 22);
            }
            other => panic!("expected HostKeyChanged, got {other:?}"),
        }
    }

    #[test]
    fn test_learn_records_new_host() {
        let dir = tempfile::tempdir().unwrap();
        let kh = dir.path().join("known_hosts");
        std::fs::File::create(&kh).unwrap();

        let v = verifier(&kh);
        let key = parse_key(ED25519_A);
        v.learn(&key).unwrap();
        assert!(v.check(&key).unwrap());
    }
}
