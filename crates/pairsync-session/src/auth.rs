//! Credential resolution for the session handshake.
//!
//! PairSync doesn't acquire credentials (OAuth flows, key generation and
//! the like live elsewhere). A server descriptor only names a credential
//! through a [`CredentialRef`]; right before each handshake the session
//! asks a [`CredentialStore`] to turn that handle into the token it
//! sends in `Hello`.

use std::collections::HashMap;
use std::future::Future;

use pairsync_registry::CredentialRef;

use crate::ConnectError;

/// Resolves a credential handle to a handshake token.
///
/// # Example
///
/// ```rust
/// use pairsync_registry::CredentialRef;
/// use pairsync_session::{ConnectError, CredentialStore};
///
/// /// Reads tokens from environment variables named after the handle.
/// struct EnvCredentials;
///
/// impl CredentialStore for EnvCredentials {
///     async fn resolve(&self, credential: &CredentialRef) -> Result<String, ConnectError> {
///         std::env::var(format!("PAIRSYNC_TOKEN_{}", credential.as_str().to_uppercase()))
///             .map_err(|_| ConnectError::Credential(credential.to_string()))
///     }
/// }
/// ```
pub trait CredentialStore: Send + Sync + 'static {
    /// Returns the token for `credential`.
    ///
    /// # Errors
    /// [`ConnectError::Credential`] if the handle is unknown. That error
    /// is terminal: the session halts instead of retrying.
    fn resolve(
        &self,
        credential: &CredentialRef,
    ) -> impl Future<Output = Result<String, ConnectError>> + Send;
}

/// An in-memory map from handle to token.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<CredentialRef, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a token, builder style.
    pub fn with(mut self, credential: impl Into<String>, token: impl Into<String>) -> Self {
        self.insert(CredentialRef::new(credential), token);
        self
    }

    pub fn insert(&mut self, credential: CredentialRef, token: impl Into<String>) {
        self.tokens.insert(credential, token.into());
    }
}

impl CredentialStore for StaticCredentials {
    async fn resolve(&self, credential: &CredentialRef) -> Result<String, ConnectError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or_else(|| ConnectError::Credential(credential.to_string()))
    }
}
