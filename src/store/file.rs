//! JSON file credential store.
//!
//! Maps caller ids to durable credentials in one file. Writes go to a temp
//! file in the same directory and are renamed over the target. A tokio Mutex
//! serializes concurrent writers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::models::{CallerIdentity, DurableCredential};
use crate::store::CredentialStore;

/// File-backed credential store
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, DurableCredential>>,
}

impl FileCredentialStore {
    /// Load credentials from `path`, creating an empty file on cold start
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CatalogError::Storage(format!("reading credential file: {}", e)))?;
            let credentials: HashMap<String, DurableCredential> = serde_json::from_str(&contents)?;
            info!(path = %path.display(), callers = credentials.len(), "loaded credentials");
            credentials
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty store");
            let empty = HashMap::new();
            write_atomic(&path, &empty).await?;
            empty
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn read(&self, caller: &CallerIdentity) -> Result<Option<DurableCredential>> {
        let state = self.state.lock().await;
        Ok(state.get(caller.as_str()).cloned())
    }

    async fn write(&self, caller: &CallerIdentity, credential: DurableCredential) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.insert(caller.as_str().to_string(), credential);
        write_atomic(&self.path, &next).await?;
        *state = next;
        debug!(caller = %caller, "stored credential");
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &HashMap<String, DurableCredential>) -> Result<()> {
    let json = serde_json::to_vec_pretty(data)?;
    let target = path.to_path_buf();

    tokio::task::spawn_blocking(move || persist(&target, &json))
        .await
        .map_err(|e| CatalogError::Storage(format!("credential write task failed: {}", e)))??;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

/// Write to a temp file beside `path`, then rename it into place
fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| CatalogError::Storage(format!("creating credential directory: {}", e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| CatalogError::Storage(format!("creating temp credential file: {}", e)))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| CatalogError::Storage(format!("writing temp credential file: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CatalogError::Storage(format!("setting credential file permissions: {}", e)))?;
    }

    tmp.persist(path)
        .map_err(|e| CatalogError::Storage(format!("renaming temp credential file: {}", e.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let caller = CallerIdentity::new("42").unwrap();

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .write(&caller, DurableCredential::new("at", "ats"))
            .await
            .unwrap();

        let reloaded = FileCredentialStore::load(path).await.unwrap();
        let credential = reloaded.read(&caller).await.unwrap().unwrap();
        assert_eq!(credential.token, "at");
        assert_eq!(credential.token_secret, "ats");
    }

    #[tokio::test]
    async fn test_cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        assert!(store.is_empty().await);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, DurableCredential> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let result = FileCredentialStore::load(path).await;
        assert!(matches!(result, Err(CatalogError::Storage(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .write(
                &CallerIdentity::new("u1").unwrap(),
                DurableCredential::new("t", "s"),
            )
            .await
            .unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn test_concurrent_writes_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = Arc::new(FileCredentialStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let caller = CallerIdentity::new(format!("u{}", i)).unwrap();
                store
                    .write(&caller, DurableCredential::new(format!("t{}", i), "s"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await, 10);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, DurableCredential> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 10);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        let kept = CallerIdentity::new("kept").unwrap();
        store
            .write(&kept, DurableCredential::new("t0", "s0"))
            .await
            .unwrap();

        // A non-empty directory at the target makes the rename fail
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("blocker"), "x").await.unwrap();

        let lost = CallerIdentity::new("lost").unwrap();
        let result = store.write(&lost, DurableCredential::new("t", "s")).await;
        assert!(matches!(result, Err(CatalogError::Storage(_))));
        assert!(store.read(&lost).await.unwrap().is_none());
        assert_eq!(store.read(&kept).await.unwrap().unwrap().token, "t0");
        assert_eq!(store.len().await, 1);
    }
}
