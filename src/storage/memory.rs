use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AssetBody, AssetStore, StorageError, StorageResult, StoredAsset};
use crate::media::MediaType;

/// Process-lifetime assets keyed by video id. Contents are lost on restart.
pub struct MemoryAssetStore {
    assets: Mutex<HashMap<Uuid, StoredAsset>>,
    base_url: String,
}

impl MemoryAssetStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            assets: Mutex::new(HashMap::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn store(
        &self,
        video_id: Uuid,
        _key: &str,
        body: AssetBody,
        media_type: &MediaType,
    ) -> StorageResult<String> {
        let asset = StoredAsset {
            data: body.into_bytes().await?,
            media_type: media_type.essence(),
        };
        let replaced = self.assets.lock().await.insert(video_id, asset).is_some();
        if replaced {
            tracing::debug!(%video_id, "Replaced in-memory asset");
        }
        Ok(format!("{}/api/thumbnails/{}", self.base_url, video_id))
    }

    async fn retrieve(&self, key: &str) -> StorageResult<StoredAsset> {
        let video_id =
            Uuid::parse_str(key).map_err(|_| StorageError::InvalidKey(key.to_string()))?;
        self.assets
            .lock()
            .await
            .get(&video_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
