use poem_openapi::{
    param::Path,
    payload::{Binary, Json},
    ApiResponse,
};
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::storage::{StorageError, StoredAsset};

#[derive(Debug, ApiResponse)]
pub enum ThumbnailResponse {
    /// Thumbnail bytes
    #[oai(status = 200, content_type = "image/png")]
    OKPNG(Binary<Vec<u8>>),
    #[oai(status = 200, content_type = "image/jpeg")]
    OKJPEG(Binary<Vec<u8>>),
    #[oai(status = 200, content_type = "application/octet-stream")]
    OKOther(Binary<Vec<u8>>),
    /// No thumbnail stored for this video
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
    /// Internal Error
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

impl super::Api {
    pub async fn get_thumbnail_impl(&self, video_id: Path<Uuid>) -> ThumbnailResponse {
        match self.state.thumbnails.retrieve(&video_id.0.to_string()).await {
            Ok(StoredAsset { data, media_type }) => {
                let body = Binary(data.to_vec());
                match media_type.as_str() {
                    "image/png" => ThumbnailResponse::OKPNG(body),
                    "image/jpeg" => ThumbnailResponse::OKJPEG(body),
                    _ => ThumbnailResponse::OKOther(body),
                }
            }
            Err(e @ (StorageError::NotFound(_) | StorageError::InvalidKey(_))) => {
                ThumbnailResponse::NotFound(Json(ErrorBody::new(e)))
            }
            Err(e) => {
                tracing::error!(video_id = %video_id.0, error = %e, "Couldn't read thumbnail");
                ThumbnailResponse::InternalError(Json(ErrorBody::new(e)))
            }
        }
    }
}
