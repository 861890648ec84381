use chrono::{DateTime, Utc};

use crate::store::{DiagramId, DiagramRecord};

/// The diagram being edited.
///
/// `source_text` follows the keyboard. `last_persisted_text` is the
/// watermark of what the store is known to hold and only moves when a save
/// is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DiagramId,
    pub title: String,
    pub source_text: String,
    last_persisted_text: String,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn from_record(record: DiagramRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            last_persisted_text: record.code.clone(),
            source_text: record.code,
            updated_at: record.updated_at,
        }
    }

    pub fn last_persisted_text(&self) -> &str {
        &self.last_persisted_text
    }

    /// Whether the editor holds text the store has not confirmed.
    pub fn is_diverged(&self) -> bool {
        self.source_text != self.last_persisted_text
    }

    pub(crate) fn mark_persisted(&mut self, text: String, at: DateTime<Utc>) {
        self.last_persisted_text = text;
        self.updated_at = at;
    }
}
