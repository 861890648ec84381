//! Record and blob storage capabilities.
//!
//! The dashboard only talks to storage through [`RecordStore`] and
//! [`BlobStore`]. [`MemoryStore`] keeps everything in process;
//! [`JsonFileStore`] keeps the same tables in one JSON file;
//! [`DirBlobStore`] keeps uploaded files in a directory.

mod blob;
mod json_file;
mod memory;
mod records;
mod tables;

pub use blob::{DirBlobStore, thumbnail_key};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use records::{DiagramId, DiagramPatch, DiagramRecord, NewDiagram, Profile};

use async_trait::async_trait;

/// Source text every new diagram starts with.
pub const DEFAULT_DIAGRAM_CODE: &str =
    "graph TD;\n    A[Start] --> B[Lookin Good];\n    B --> C[Profit];";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("diagram {0} not found")]
    NotFound(DiagramId),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store data: {0}")]
    Format(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed access to the `diagrams` collection and user profiles.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(&self, id: &DiagramId) -> Result<Option<DiagramRecord>, StoreError>;

    /// Diagrams owned by `owner`, most recently created first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<DiagramRecord>, StoreError>;

    async fn insert(&self, new: NewDiagram) -> Result<DiagramRecord, StoreError>;

    /// Replace the patched fields and refresh `updated_at`.
    async fn update(&self, id: &DiagramId, patch: DiagramPatch)
    -> Result<DiagramRecord, StoreError>;

    async fn delete(&self, id: &DiagramId) -> Result<(), StoreError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError>;
}

/// File storage with public retrieval URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    fn public_url(&self, key: &str) -> String;
}
