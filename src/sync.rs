//! Autosave of the editor text to the record store.
//!
//! [`PersistenceSynchronizer`] waits for the text to be quiet, skips saves
//! that would not change anything, keeps at most one save in flight, and
//! only moves the document's watermark when the store confirms a write.
//! A failed save is not retried; the next edit that settles tries again.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::debounce::Debouncer;
use crate::editor::Document;
use crate::store::DiagramId;

/// Save indicator shown next to the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Error(String),
}

impl SaveStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Saved",
            Self::Saving => "Saving...",
            Self::Error(_) => "Save failed",
        }
    }
}

/// A write the runtime should send to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub document_id: DiagramId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PersistenceSynchronizer {
    quiet: Debouncer<String>,
    status: SaveStatus,
    in_flight: Option<String>,
    parked: Option<String>,
}

impl PersistenceSynchronizer {
    pub const fn new(quiet_ms: u64) -> Self {
        Self {
            quiet: Debouncer::new(quiet_ms),
            status: SaveStatus::Idle,
            in_flight: None,
            parked: None,
        }
    }

    pub const fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.quiet.deadline_ms()
    }

    /// Note the latest editor text; restarts the quiet period.
    pub fn observe(&mut self, text: &str, now_ms: u64) {
        self.quiet.queue(text.to_string(), now_ms);
    }

    /// Evaluate the settled text, if the quiet period is over.
    pub fn poll(&mut self, doc: &Document, now_ms: u64) -> Option<SaveRequest> {
        let text = self.quiet.take_ready(now_ms)?;
        self.sync(doc, text)
    }

    /// Decide whether `text` needs saving.
    ///
    /// Nothing is issued when the store already holds `text`. While a save
    /// is in flight the value is parked and looked at again on completion.
    pub fn sync(&mut self, doc: &Document, text: String) -> Option<SaveRequest> {
        if self.in_flight.is_some() {
            debug!(id = %doc.id, "save in flight, parking value");
            self.parked = Some(text);
            return None;
        }
        if text == doc.last_persisted_text() {
            // Nothing is unsaved; any earlier failure is stale.
            self.status = SaveStatus::Idle;
            return None;
        }
        info!(id = %doc.id, bytes = text.len(), "saving");
        self.status = SaveStatus::Saving;
        self.in_flight = Some(text.clone());
        Some(SaveRequest {
            document_id: doc.id.clone(),
            text,
        })
    }

    /// Record the end of the in-flight save.
    ///
    /// On success the watermark and `updated_at` advance to what was
    /// written; on failure they stay and the reason is kept in the status.
    /// A value parked during the save is evaluated now and may produce the
    /// next request.
    pub fn complete(
        &mut self,
        doc: &mut Document,
        outcome: Result<DateTime<Utc>, String>,
    ) -> Option<SaveRequest> {
        let Some(written) = self.in_flight.take() else {
            warn!(id = %doc.id, "save completion without a save in flight");
            return None;
        };
        match outcome {
            Ok(updated_at) => {
                debug!(id = %doc.id, "save confirmed");
                doc.mark_persisted(written, updated_at);
                self.status = SaveStatus::Idle;
            }
            Err(reason) => {
                warn!(id = %doc.id, %reason, "save failed");
                self.status = SaveStatus::Error(reason);
            }
        }
        let parked = self.parked.take()?;
        self.sync(doc, parked)
    }
}
