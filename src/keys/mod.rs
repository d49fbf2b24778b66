//! Key Resolver: credential fallback chain.

pub mod error;

use async_trait::async_trait;

pub use error::KeyError;
use crate::provider::Credential;

/// Storage seam for credentials, scoped by (owner, provider). `owner` is either a
/// tenant id (tenant-owner credential) or a user id (current-user credential); the
/// resolver decides which owner to look up at each step of the chain.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up a credential for `(owner, provider)`.
    async fn lookup(&self, owner: &str, provider: &str) -> Result<Option<Credential>, KeyError>;
}

/// In-memory [`CredentialStore`], keyed by `(owner, provider)`.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: parking_lot::RwLock<std::collections::BTreeMap<(String, String), String>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the credential for `(owner, provider)`.
    pub fn set(&self, owner: &str, provider: &str, secret: impl Into<String>) {
        self.credentials
            .write()
            .insert((owner.to_string(), provider.to_string()), secret.into());
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, owner: &str, provider: &str) -> Result<Option<Credential>, KeyError> {
        Ok(self
            .credentials
            .read()
            .get(&(owner.to_string(), provider.to_string()))
            .map(|secret| Credential::new(secret.clone())))
    }
}

/// Resolves a credential for `(tenant, user, provider)` via the fallback chain: (1)
/// tenant-owner credential, (2) current-user credential, (3) process-level default.
/// Stops at the first hit.
pub struct KeyResolver<S: CredentialStore> {
    store: S,
    process_default: Option<Credential>,
}

impl<S: CredentialStore> KeyResolver<S> {
    /// Builds a resolver over a credential store, with an optional process-level
    /// default used only when neither the tenant nor the user has one configured.
    pub fn new(store: S, process_default: Option<Credential>) -> Self {
        Self {
            store,
            process_default,
        }
    }

    /// Resolves a credential for the given tenant/user/provider triple.
    pub async fn resolve(
        &self,
        tenant: &str,
        user: &str,
        provider: &str,
    ) -> Result<Credential, KeyError> {
        if let Some(credential) = self.store.lookup(tenant, provider).await? {
            return Ok(credential);
        }
        if let Some(credential) = self.store.lookup(user, provider).await? {
            return Ok(credential);
        }
        if let Some(credential) = &self.process_default {
            return Ok(credential.clone());
        }
        Err(KeyError::NoCredential {
            tenant: tenant.to_string(),
            provider: provider.to_string(),
        })
    }
}
