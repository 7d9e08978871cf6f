//! Policy document store.
//!
//! Owns the in-memory [`PolicyDocument`] and its durable mirror. Every
//! mutation runs against the current in-memory state under a write lock and
//! is persisted synchronously before the caller regains control; there is no
//! deferred flush. The lock is never held across an await: mutate, clone,
//! release, then write the clone out.

use super::PolicyDocument;
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Host-provided persistence seam for the policy document.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Load the stored document, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<PolicyDocument>, StoreError>;

    /// Durably save the document, creating any missing storage location.
    async fn save(&self, doc: &PolicyDocument) -> Result<(), StoreError>;
}

/// JSON file backend.
///
/// The document is stored as one pretty-printed JSON object, matching the
/// historical on-disk format.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PolicyBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<PolicyDocument>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc = serde_json::from_str(&raw)?;
        Ok(Some(doc))
    }

    async fn save(&self, doc: &PolicyDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(doc)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryBackend {
    slot: RwLock<Option<Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with a raw document value, as a host that already
    /// holds a stored document would.
    pub fn seeded(value: Value) -> Self {
        Self { slot: RwLock::new(Some(value)) }
    }
}

#[async_trait]
impl PolicyBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<PolicyDocument>, StoreError> {
        let Some(value) = self.slot.read().clone() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn save(&self, doc: &PolicyDocument) -> Result<(), StoreError> {
        *self.slot.write() = Some(serde_json::to_value(doc)?);
        Ok(())
    }
}

/// Shared handle to the policy document and its durable mirror.
#[derive(Clone)]
pub struct PolicyStore {
    doc: Arc<RwLock<PolicyDocument>>,
    backend: Arc<dyn PolicyBackend>,
}

impl PolicyStore {
    /// Open the store: load the stored document, or initialize defaults and
    /// persist them immediately if absent.
    pub async fn open(backend: Arc<dyn PolicyBackend>) -> Result<Self, StoreError> {
        let doc = match backend.load().await {
            Ok(Some(doc)) => {
                info!("policy document loaded");
                doc
            }
            Ok(None) => {
                let doc = PolicyDocument::default();
                backend.save(&doc).await?;
                info!("policy document initialized with defaults");
                doc
            }
            Err(e) => {
                // A corrupt document must not take the host down; start from
                // defaults but do not overwrite the stored copy.
                warn!(error = %e, "failed to load policy document, starting from defaults");
                PolicyDocument::default()
            }
        };
        Ok(Self { doc: Arc::new(RwLock::new(doc)), backend })
    }

    /// Read a value out of the current document.
    pub fn read<R>(&self, f: impl FnOnce(&PolicyDocument) -> R) -> R {
        f(&self.doc.read())
    }

    /// Clone the current document.
    pub fn snapshot(&self) -> PolicyDocument {
        self.doc.read().clone()
    }

    /// Mutate the document and persist the result before returning.
    ///
    /// The closure runs against the live in-memory state under the write
    /// lock, so a mutation always merges into the latest document rather
    /// than clobbering a concurrent write with a stale copy.
    pub async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut PolicyDocument) -> R,
    ) -> Result<R, StoreError> {
        let (result, copy) = {
            let mut guard = self.doc.write();
            let result = f(&mut guard);
            (result, guard.clone())
        };
        self.backend.save(&copy).await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NicknameLock;
    use serde_json::json;

    #[tokio::test]
    async fn open_initializes_and_persists_defaults() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PolicyStore::open(backend.clone()).await.unwrap();

        assert!(store.read(|d| d.welcome_enable));
        // The defaults were written through, not just held in memory.
        let stored = backend.load().await.unwrap().unwrap();
        assert_eq!(stored, PolicyDocument::default());
    }

    #[tokio::test]
    async fn mutate_persists_synchronously() {
        let backend = Arc::new(MemoryBackend::new());
        let store = PolicyStore::open(backend.clone()).await.unwrap();

        store
            .mutate(|doc| {
                doc.set_lock("g1", "u1", NicknameLock {
                    nickname: "小明".into(),
                    locked_by_admin: false,
                });
            })
            .await
            .unwrap();

        let stored = backend.load().await.unwrap().unwrap();
        assert_eq!(stored.lock_for("g1", "u1").unwrap().nickname, "小明");
    }

    #[tokio::test]
    async fn merge_round_trip_preserves_unrelated_keys() {
        let backend = Arc::new(MemoryBackend::seeded(json!({
            "filterKeywords": "加群|兼职",
            "lockedNicknames": { "g1": { "u1": "legacy" } },
            "unknownKey": 7
        })));
        let store = PolicyStore::open(backend.clone()).await.unwrap();

        store
            .mutate(|doc| {
                let partial = json!({ "welcomeEnable": false });
                let Value::Object(partial) = partial else { unreachable!() };
                doc.merge(partial).unwrap();
            })
            .await
            .unwrap();

        let stored = backend.load().await.unwrap().unwrap();
        assert!(!stored.welcome_enable);
        assert_eq!(stored.filter_keywords, "加群|兼职");
        // Legacy entry survived (normalized), unknown key survived untouched.
        assert!(stored.lock_for("g1", "u1").unwrap().locked_by_admin);
        assert_eq!(stored.extra.get("unknownKey"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn file_backend_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("policy.json");
        let backend = Arc::new(JsonFileBackend::new(&path));

        assert!(backend.load().await.unwrap().is_none());

        let store = PolicyStore::open(backend.clone()).await.unwrap();
        store.mutate(|doc| doc.filter_enable = true).await.unwrap();

        let reloaded = backend.load().await.unwrap().unwrap();
        assert!(reloaded.filter_enable);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn corrupt_document_falls_back_to_defaults_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let backend = Arc::new(JsonFileBackend::new(&path));
        let store = PolicyStore::open(backend).await.unwrap();
        assert_eq!(store.snapshot(), PolicyDocument::default());

        // The broken file was left in place for operator inspection.
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "{ not json");
    }
}
