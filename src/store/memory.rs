//! In-process credential store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CatalogError, Result};
use crate::models::{CallerIdentity, DurableCredential};
use crate::store::CredentialStore;

/// A credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<HashMap<CallerIdentity, DurableCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials
    pub fn len(&self) -> usize {
        self.credentials.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn read(&self, caller: &CallerIdentity) -> Result<Option<DurableCredential>> {
        let guard = self
            .credentials
            .lock()
            .map_err(|_| CatalogError::Storage("credential map poisoned".to_string()))?;
        Ok(guard.get(caller).cloned())
    }

    async fn write(&self, caller: &CallerIdentity, credential: DurableCredential) -> Result<()> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|_| CatalogError::Storage("credential map poisoned".to_string()))?;
        guard.insert(caller.clone(), credential);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write() {
        let store = MemoryCredentialStore::new();
        let caller = CallerIdentity::new("u1").unwrap();

        assert!(store.read(&caller).await.unwrap().is_none());
        store
            .write(&caller, DurableCredential::new("t", "s"))
            .await
            .unwrap();
        assert_eq!(
            store.read(&caller).await.unwrap(),
            Some(DurableCredential::new("t", "s"))
        );
        assert_eq!(store.len(), 1);
    }
}
