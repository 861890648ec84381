use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::tables::Tables;
use super::{
    DiagramId, DiagramPatch, DiagramRecord, NewDiagram, Profile, RecordStore, StoreError,
};

/// Process-local record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, id: &DiagramId) -> Result<Option<DiagramRecord>, StoreError> {
        Ok(self.tables.lock().await.fetch(id))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<DiagramRecord>, StoreError> {
        Ok(self.tables.lock().await.list_by_owner(owner))
    }

    async fn insert(&self, new: NewDiagram) -> Result<DiagramRecord, StoreError> {
        self.tables.lock().await.insert(new, Utc::now())
    }

    async fn update(
        &self,
        id: &DiagramId,
        patch: DiagramPatch,
    ) -> Result<DiagramRecord, StoreError> {
        self.tables.lock().await.update(id, patch, Utc::now())
    }

    async fn delete(&self, id: &DiagramId) -> Result<(), StoreError> {
        self.tables.lock().await.delete(id)
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.lock().await.profile(user_id))
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.tables.lock().await.upsert_profile(profile);
        Ok(())
    }
}
