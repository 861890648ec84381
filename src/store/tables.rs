use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StoreError;
use super::records::{DiagramId, DiagramPatch, DiagramRecord, NewDiagram, Profile};

/// In-memory table state shared by the memory and JSON-file stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    diagrams: Vec<DiagramRecord>,
    #[serde(default)]
    profiles: Vec<Profile>,
}

impl Tables {
    pub(crate) fn fetch(&self, id: &DiagramId) -> Option<DiagramRecord> {
        self.diagrams.iter().find(|d| &d.id == id).cloned()
    }

    /// Newest first; ties go to the later insert.
    pub(crate) fn list_by_owner(&self, owner: &str) -> Vec<DiagramRecord> {
        let mut rows: Vec<DiagramRecord> = self
            .diagrams
            .iter()
            .rev()
            .filter(|d| d.created_by == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    pub(crate) fn insert(
        &mut self,
        new: NewDiagram,
        now: DateTime<Utc>,
    ) -> Result<DiagramRecord, StoreError> {
        if new.title.trim().is_empty() {
            return Err(StoreError::Invalid("title is required".to_string()));
        }
        if new.created_by.is_empty() {
            return Err(StoreError::Invalid("owner is required".to_string()));
        }
        let record = DiagramRecord {
            id: DiagramId::generate(),
            title: new.title,
            description: new.description,
            code: new.code,
            thumbnail_url: new.thumbnail_url,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.diagrams.push(record.clone());
        Ok(record)
    }

    pub(crate) fn update(
        &mut self,
        id: &DiagramId,
        patch: DiagramPatch,
        now: DateTime<Utc>,
    ) -> Result<DiagramRecord, StoreError> {
        let record = self
            .diagrams
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = Some(description);
        }
        if let Some(code) = patch.code {
            record.code = code;
        }
        if let Some(url) = patch.thumbnail_url {
            record.thumbnail_url = Some(url);
        }
        record.updated_at = now.max(record.updated_at);
        Ok(record.clone())
    }

    pub(crate) fn delete(&mut self, id: &DiagramId) -> Result<(), StoreError> {
        let before = self.diagrams.len();
        self.diagrams.retain(|d| &d.id != id);
        if self.diagrams.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(())
    }

    pub(crate) fn profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.iter().find(|p| p.id == user_id).cloned()
    }

    pub(crate) fn upsert_profile(&mut self, profile: Profile) {
        if let Some(existing) = self.profiles.iter_mut().find(|p| p.id == profile.id) {
            *existing = profile;
        } else {
            self.profiles.push(profile);
        }
    }
}
