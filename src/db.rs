use std::collections::HashMap;

use async_trait::async_trait;
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video {0} not found")]
    NotFound(Uuid),
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Object)]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VideoRecord {
    pub fn new(user_id: Uuid, title: String, description: String) -> Self {
        let created_at = now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            thumbnail_url: None,
            video_url: None,
            updated_at: created_at.clone(),
            created_at,
        }
    }

    /// Stamps `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// UTC timestamp with nanosecond precision.
pub fn now() -> String {
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");
    time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_default()
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create_video(&self, record: VideoRecord) -> Result<VideoRecord, StoreError>;

    async fn get_video(&self, id: Uuid) -> Result<VideoRecord, StoreError>;

    /// Persists the asset URLs and `updated_at` of an existing record.
    async fn update_video(&self, record: &VideoRecord) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryVideoStore {
    videos: RwLock<HashMap<Uuid, VideoRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn create_video(&self, record: VideoRecord) -> Result<VideoRecord, StoreError> {
        let mut videos = self.videos.write().await;
        videos.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_video(&self, id: Uuid) -> Result<VideoRecord, StoreError> {
        self.videos
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_video(&self, record: &VideoRecord) -> Result<(), StoreError> {
        let mut videos = self.videos.write().await;
        let stored = videos
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        // Ownership and creation metadata are fixed once the record exists.
        stored.thumbnail_url = record.thumbnail_url.clone();
        stored.video_url = record.video_url.clone();
        stored.updated_at = record.updated_at.clone();
        Ok(())
    }
}
