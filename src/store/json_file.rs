use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use super::tables::Tables;
use super::{
    DiagramId, DiagramPatch, DiagramRecord, NewDiagram, Profile, RecordStore, StoreError,
};

/// Record store persisted as a single JSON document.
///
/// Every mutation rewrites the file through a temporary sibling and a
/// rename, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Tables::default()
        };
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(tables)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "store persisted");
        Ok(())
    }

    /// Apply `change` to a copy of the tables and commit it only if the
    /// write to disk succeeds.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Tables) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut next = tables.clone();
        let value = change(&mut next)?;
        self.persist(&next).await?;
        *tables = next;
        Ok(value)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn fetch(&self, id: &DiagramId) -> Result<Option<DiagramRecord>, StoreError> {
        Ok(self.tables.lock().await.fetch(id))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<DiagramRecord>, StoreError> {
        Ok(self.tables.lock().await.list_by_owner(owner))
    }

    async fn insert(&self, new: NewDiagram) -> Result<DiagramRecord, StoreError> {
        self.mutate(|t| t.insert(new, Utc::now())).await
    }

    async fn update(
        &self,
        id: &DiagramId,
        patch: DiagramPatch,
    ) -> Result<DiagramRecord, StoreError> {
        self.mutate(|t| t.update(id, patch, Utc::now())).await
    }

    async fn delete(&self, id: &DiagramId) -> Result<(), StoreError> {
        self.mutate(|t| t.delete(id)).await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.lock().await.profile(user_id))
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.mutate(|t| {
            t.upsert_profile(profile);
            Ok(())
        })
        .await
    }
}
