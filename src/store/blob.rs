use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{BlobStore, StoreError};

/// Blob store writing each object to `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
    bucket: String,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(&self.bucket).join(relative))
    }
}

#[async_trait]
impl BlobStore for DirBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        let path = self.root.join(&self.bucket).join(key);
        format!("file://{}", path.display())
    }
}

/// Namespaced object key for a thumbnail upload: `<owner>/<random>.<ext>`.
///
/// The extension is taken from the uploaded file's name when it has one.
pub fn thumbnail_key(owner: &str, file_name: &str) -> String {
    let random = uuid::Uuid::new_v4().simple();
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{owner}/{random}.{ext}"),
        _ => format!("{owner}/{random}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upload_writes_under_bucket() {
        let dir = tempdir().unwrap();
        let store = DirBlobStore::new(dir.path(), "thumbnails");
        store.upload("u1/cover.png", vec![1, 2, 3]).await.unwrap();
        let written = std::fs::read(dir.path().join("thumbnails/u1/cover.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
        assert!(store.public_url("u1/cover.png").starts_with("file://"));
        assert!(store.public_url("u1/cover.png").ends_with("cover.png"));
    }

    #[tokio::test]
    async fn test_escaping_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store = DirBlobStore::new(dir.path(), "thumbnails");
        for key in ["../escape.png", "/abs.png", "", "u1/../../x"] {
            let err = store.upload(key, vec![0]).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {key:?}");
        }
    }

    #[test]
    fn test_thumbnail_key_keeps_extension_and_owner() {
        let key = thumbnail_key("u1", "photo.jpeg");
        assert!(key.starts_with("u1/"));
        assert!(key.ends_with(".jpeg"));
        assert_ne!(key, thumbnail_key("u1", "photo.jpeg"));
        assert!(!thumbnail_key("u1", "noext").contains('.'));
    }
}
