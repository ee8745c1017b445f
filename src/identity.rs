//! Identity repositories and public-key authentication.
//!
//! The configured client carries exactly one [`IdentityRepository`] plus an
//! optional explicitly registered [`Identity`]. Keys are never decrypted at
//! configuration time; the explicit identity is loaded lazily when the server
//! asks for it, so a bad path or passphrase surfaces as an authentication
//! failure, not a construction failure.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use russh::client::{self, Handle};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, load_secret_key};
use secrecy::{ExposeSecret, SecretString};

use crate::agent::AgentConnector;
use crate::error::{Result, TransportError};

/// Source of authentication identities for a client.
#[derive(Debug, Clone, Default)]
pub enum IdentityRepository {
    /// Key files from the conventional locations under `~/.ssh`.
    #[default]
    Default,

    /// Identities held by a running SSH agent; private keys never leave
    /// the agent process.
    Agent(AgentConnector),
}

impl IdentityRepository {
    pub fn is_agent(&self) -> bool {
        matches!(self, Self::Agent(_))
    }
}

/// Global authentication preference for a client.
///
/// The factory narrows this to `PublicKeyOnly` when an agent connector is
/// installed. Carried per client, so concurrent factories never share state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthPreference {
    /// No restriction; the transport offers whatever it can.
    #[default]
    Default,

    /// Offer public-key authentication exclusively.
    PublicKeyOnly,
}

/// An explicitly registered private key file.
#[derive(Clone)]
pub struct Identity {
    pub path: PathBuf,
    pub passphrase: Option<SecretString>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("path", &self.path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Identity {
    /// Load and, if needed, decrypt the key file.
    fn load(&self) -> std::result::Result<PrivateKey, TransportError> {
        load_secret_key(
            &self.path,
            self.passphrase.as_ref().map(|p| p.expose_secret()),
        )
        .map_err(|e| TransportError::KeyLoad {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// Key files probed when the repository is [`IdentityRepository::Default`]
/// and no explicit identity matched.
fn default_key_candidates() -> Vec<PathBuf> {
    let Ok(home) = env::var("HOME") else {
        return Vec::new();
    };
    ["id_ed25519", "id_rsa", "id_ecdsa"]
        .iter()
        .map(|name| PathBuf::from(&home).join(".ssh").join(name))
        .collect()
}

/// Offer one loaded key to the server.
async fn offer_key<H: client::Handler>(
    handle: &mut Handle<H>,
    user: &str,
    key: PrivateKey,
) -> std::result::Result<bool, TransportError> {
    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
    let result = handle
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
        .await?;
    Ok(result.success())
}

/// Drive public-key authentication for a connected session.
///
/// Order: the explicit identity first (it is explicit operator intent), then
/// the repository's identities, each offered in turn. An explicit identity
/// that fails to load is fatal; one the server merely rejects falls through
/// to the repository.
pub(crate) async fn authenticate<H: client::Handler>(
    handle: &mut Handle<H>,
    user: &str,
    repository: &IdentityRepository,
    identity: Option<&Identity>,
) -> Result<()> {
    if let Some(identity) = identity {
        let key = identity.load()?;
        if offer_key(handle, user, key).await? {
            return Ok(());
        }
    }

    match repository {
        IdentityRepository::Agent(connector) => {
            let mut agent = connector.client().await?;
            let keys = agent
                .request_identities()
                .await
                .map_err(|e| crate::error::AgentError::Protocol(e.to_string()))?;

            for key in keys {
                match handle
                    .authenticate_publickey_with(user, key, None, &mut agent)
                    .await
                {
                    Ok(result) if result.success() => return Ok(()),
                    _ => continue,
                }
            }
        }
        IdentityRepository::Default => {
            for path in default_key_candidates() {
                // Unreadable or absent candidates are simply skipped.
                let Ok(key) = load_secret_key(&path, None) else {
                    continue;
                };
                if offer_key(handle, user, key).await? {
                    return Ok(());
                }
            }
        }
    }

    Err(TransportError::AuthenticationFailed {
        user: user.to_string(),
    }
    .into())
}
