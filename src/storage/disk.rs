use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{check_key, AssetBody, AssetStore, StorageError, StorageResult, StoredAsset};
use crate::media::MediaType;

/// Route prefix under which the assets directory is served.
pub const ASSETS_ROUTE: &str = "/assets";

/// Flat directory of assets served statically at `/assets/<key>`.
#[derive(Clone, Debug)]
pub struct DiskAssetStore {
    root: PathBuf,
    base_url: String,
}

impl DiskAssetStore {
    /// Creates the root directory if it does not exist yet.
    pub async fn new(root: impl Into<PathBuf>, base_url: &str) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl AssetStore for DiskAssetStore {
    async fn store(
        &self,
        video_id: Uuid,
        key: &str,
        body: AssetBody,
        _media_type: &MediaType,
    ) -> StorageResult<String> {
        let path = self.path_for(key)?;
        let size = body.size();
        match body {
            AssetBody::Bytes(data) => tokio::fs::write(&path, &data).await?,
            AssetBody::File { path: spooled, .. } => {
                tokio::fs::copy(&spooled, &path).await?;
            }
        }

        tracing::info!(
            path = %path.display(),
            %video_id,
            size_bytes = size,
            "Local asset written"
        );
        Ok(format!("{}{}/{}", self.base_url, ASSETS_ROUTE, key))
    }

    async fn retrieve(&self, key: &str) -> StorageResult<StoredAsset> {
        let path = self.path_for(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let media_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(StoredAsset {
            data: data.into(),
            media_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::io::Write;

    use crate::storage::{KeyGenerator, RandomKeyGenerator};

    #[tokio::test]
    async fn writes_under_root_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().join("assets"), "http://localhost:8091/")
            .await
            .unwrap();
        let png = MediaType::parse("image/png").unwrap();
        let key = RandomKeyGenerator.generate(&png);

        let url = store
            .store(Uuid::new_v4(), &key, Bytes::from_static(b"\x89PNG").into(), &png)
            .await
            .unwrap();
        assert_eq!(url, format!("http://localhost:8091/assets/{}", key));
        assert!(store.root().join(&key).is_file());

        let asset = store.retrieve(&key).await.unwrap();
        assert_eq!(asset.data, Bytes::from_static(b"\x89PNG"));
        assert_eq!(asset.media_type, "image/png");
    }

    #[tokio::test]
    async fn copies_spooled_file_and_releases_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().join("assets"), "http://localhost")
            .await
            .unwrap();
        let mut spooled = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
        spooled.write_all(b"ftypisom").unwrap();
        let spooled = spooled.into_temp_path();
        let spooled_at = spooled.to_path_buf();

        let mp4 = MediaType::parse("video/mp4").unwrap();
        let body = AssetBody::File {
            path: spooled,
            size: 8,
        };
        store.store(Uuid::new_v4(), "clip.mp4", body, &mp4).await.unwrap();

        assert!(!spooled_at.exists());
        let asset = store.retrieve("clip.mp4").await.unwrap();
        assert_eq!(asset.data, Bytes::from_static(b"ftypisom"));
        assert_eq!(asset.media_type, "video/mp4");
    }

    #[tokio::test]
    async fn unknown_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path(), "http://localhost").await.unwrap();
        tokio::fs::write(dir.path().join("blob.zzqx"), b"?").await.unwrap();
        let asset = store.retrieve("blob.zzqx").await.unwrap();
        assert_eq!(asset.media_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_and_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path(), "http://localhost").await.unwrap();
        assert!(matches!(
            store.retrieve("nope.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.retrieve("../secret").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn write_failure_surfaces_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskAssetStore::new(dir.path().join("gone"), "http://localhost")
            .await
            .unwrap();
        tokio::fs::remove_dir(store.root()).await.unwrap();
        let png = MediaType::parse("image/png").unwrap();
        assert!(matches!(
            store
                .store(Uuid::new_v4(), "a.png", Bytes::from_static(b"x").into(), &png)
                .await,
            Err(StorageError::Io(_))
        ));
    }
}
