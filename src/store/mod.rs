//! Per-caller token lifecycle.
//!
//! Pending handshakes live in a concurrent map for the lifetime of the
//! process. Completed authorizations are written through to a
//! [`CredentialStore`], which is the source of truth for signed calls.

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::models::{CallerIdentity, Credential, DurableCredential, PendingAuthorization};

/// Durable storage for long-lived credentials.
///
/// Implementations only need single-write atomicity.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    async fn read(&self, caller: &CallerIdentity) -> Result<Option<DurableCredential>>;

    async fn write(&self, caller: &CallerIdentity, credential: DurableCredential) -> Result<()>;
}

/// Volatile handshake state plus the durable credential store behind it
#[derive(Debug, Clone)]
pub struct TokenStore {
    pending: Arc<DashMap<CallerIdentity, PendingAuthorization>>,
    durable: Arc<dyn CredentialStore>,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn CredentialStore>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            durable,
        }
    }

    /// A store backed by [`MemoryCredentialStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    /// Start a handshake for `caller`, replacing any previous pending record.
    ///
    /// Concurrent handshakes for one caller are last-write-wins.
    pub fn begin_pending(
        &self,
        caller: &CallerIdentity,
        request_token: impl Into<String>,
        request_token_secret: impl Into<String>,
    ) -> PendingAuthorization {
        let record = PendingAuthorization::new(request_token, request_token_secret);
        if self.pending.insert(caller.clone(), record.clone()).is_some() {
            debug!(caller = %caller, "replaced existing pending authorization");
        }
        record
    }

    /// Snapshot of the pending record for `caller`
    pub fn pending(&self, caller: &CallerIdentity) -> Option<PendingAuthorization> {
        self.pending.get(caller).map(|entry| entry.value().clone())
    }

    /// Mark the pending handshake authorized and persist the access token.
    ///
    /// The volatile record is updated before the durable write and kept
    /// afterwards, so a failed write still leaves the caller authorized for
    /// this process. A failed write is returned as [`CatalogError::Storage`].
    pub async fn mark_authorized(
        &self,
        caller: &CallerIdentity,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Result<DurableCredential> {
        let access_token = access_token.into();
        let access_token_secret = access_token_secret.into();

        {
            let mut entry = self
                .pending
                .get_mut(caller)
                .ok_or_else(|| CatalogError::NoPendingAuthorization(caller.to_string()))?;
            entry.access_token = Some(access_token.clone());
            entry.access_token_secret = Some(access_token_secret.clone());
            entry.is_authorized = true;
        }

        let credential = DurableCredential::new(access_token, access_token_secret);
        self.durable
            .write(caller, credential.clone())
            .await
            .map_err(|e| match e {
                storage @ CatalogError::Storage(_) => storage,
                other => CatalogError::Storage(other.to_string()),
            })?;

        info!(caller = %caller, "stored durable credential");
        Ok(credential)
    }

    /// The durable record for `caller`, if any
    pub async fn durable(&self, caller: &CallerIdentity) -> Result<Option<DurableCredential>> {
        self.durable.read(caller).await
    }

    /// Credential to sign with: durable first, then an authorized pending record.
    ///
    /// A failing durable read is logged and treated as absent.
    pub async fn resolve_active_credential(&self, caller: &CallerIdentity) -> Option<Credential> {
        match self.durable.read(caller).await {
            Ok(Some(durable)) if durable.is_usable() => return Some(durable.into()),
            Ok(Some(_)) => {
                warn!(caller = %caller, "ignoring durable credential with blank token");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(caller = %caller, error = %e, "durable credential lookup failed");
            }
        }

        self.pending
            .get(caller)
            .and_then(|entry| entry.value().active_credential())
    }
}
