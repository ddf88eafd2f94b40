use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bytes::Bytes;
use rand::RngCore;
use tempfile::TempPath;
use thiserror::Error;
use uuid::Uuid;

use crate::media::MediaType;

pub mod disk;
pub mod memory;
pub mod object;

pub use disk::DiskAssetStore;
pub use memory::MemoryAssetStore;
pub use object::ObjectAssetStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub data: Bytes,
    pub media_type: String,
}

/// Bytes of a validated upload, either in memory or spooled to a temp file.
#[derive(Debug)]
pub enum AssetBody {
    Bytes(Bytes),
    /// The file is removed when the path is dropped.
    File { path: TempPath, size: u64 },
}

impl AssetBody {
    pub fn size(&self) -> u64 {
        match self {
            AssetBody::Bytes(data) => data.len() as u64,
            AssetBody::File { size, .. } => *size,
        }
    }

    pub async fn into_bytes(self) -> StorageResult<Bytes> {
        match self {
            AssetBody::Bytes(data) => Ok(data),
            AssetBody::File { path, .. } => Ok(tokio::fs::read(&path).await?.into()),
        }
    }
}

impl From<Bytes> for AssetBody {
    fn from(data: Bytes) -> Self {
        AssetBody::Bytes(data)
    }
}

/// Disk and object backends file assets under the random key; the memory
/// backend files them under the video id, so a newer upload replaces the old one.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Writes the asset once and returns its public URL.
    async fn store(
        &self,
        video_id: Uuid,
        key: &str,
        body: AssetBody,
        media_type: &MediaType,
    ) -> StorageResult<String>;

    /// Reads back an asset by the key this backend filed it under.
    async fn retrieve(&self, key: &str) -> StorageResult<StoredAsset>;
}

pub trait KeyGenerator: Send + Sync {
    fn generate(&self, media_type: &MediaType) -> String;
}

/// 32 bytes from the thread-local CSPRNG, URL-safe base64, plus the media extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeyGenerator;

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, media_type: &MediaType) -> String {
        let mut buf = [0u8; 32];
        rand::rng().fill_bytes(&mut buf);
        format!("{}.{}", URL_SAFE_NO_PAD.encode(buf), media_type.extension())
    }
}

/// Keys are single path segments; anything that could escape a prefix is refused.
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.contains("..")
        || key.starts_with('.')
        || key.contains(['/', '\\'])
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_url_safe_and_unique() {
        let png = MediaType::parse("image/png").unwrap();
        let keys: HashSet<String> = (0..256).map(|_| RandomKeyGenerator.generate(&png)).collect();
        assert_eq!(keys.len(), 256);
        for key in &keys {
            let (name, ext) = key.split_once('.').unwrap();
            assert_eq!(ext, "png");
            // 32 bytes without padding
            assert_eq!(name.len(), 43);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            assert!(check_key(key).is_ok());
        }
    }

    #[tokio::test]
    async fn spooled_body_reads_back_and_cleans_up() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), b"spooled").unwrap();
        let path = temp.into_temp_path();
        let on_disk = path.to_path_buf();

        let body = AssetBody::File { path, size: 7 };
        assert_eq!(body.size(), 7);
        assert_eq!(body.into_bytes().await.unwrap(), Bytes::from_static(b"spooled"));
        assert!(!on_disk.exists());
    }

    #[test]
    fn rejects_traversal_keys() {
        for key in ["", "../etc/passwd", "a/b.png", ".hidden", "a\\b"] {
            assert!(matches!(check_key(key), Err(StorageError::InvalidKey(_))));
        }
    }
}
