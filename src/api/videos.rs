use poem_openapi::{
    auth::Bearer, param::Path, payload::Json, ApiResponse, Object, SecurityScheme,
};
use uuid::Uuid;

use crate::db::{StoreError, VideoRecord};
use crate::error::ErrorBody;

/// `Authorization: Bearer <JWT>`
#[derive(SecurityScheme)]
#[oai(type = "bearer")]
pub struct BearerAuth(Bearer);

#[derive(Debug, Object)]
pub struct CreateVideoRequest {
    title: String,
    #[oai(default)]
    description: String,
}

#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "bad_request_handler")]
pub enum CreateVideoResponse {
    /// Video created
    #[oai(status = 201)]
    Created(Json<VideoRecord>),
    /// Bad request
    #[oai(status = 400)]
    BadRequest(Json<ErrorBody>),
    /// Missing or invalid token
    #[oai(status = 401)]
    Unauthorized(Json<ErrorBody>),
    /// Internal Error
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

fn bad_request_handler(err: poem::Error) -> CreateVideoResponse {
    CreateVideoResponse::BadRequest(Json(ErrorBody::new(err)))
}

#[derive(Debug, ApiResponse)]
#[oai(bad_request_handler = "get_bad_request_handler")]
pub enum GetVideoResponse {
    /// Video record
    #[oai(status = 200)]
    OK(Json<VideoRecord>),
    /// Invalid video id
    #[oai(status = 400)]
    BadRequest(Json<ErrorBody>),
    /// Video not found
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
    /// Internal Error
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
}

fn get_bad_request_handler(err: poem::Error) -> GetVideoResponse {
    GetVideoResponse::BadRequest(Json(ErrorBody::new(err)))
}

impl super::Api {
    pub async fn create_video_impl(
        &self,
        auth: BearerAuth,
        body: Json<CreateVideoRequest>,
    ) -> CreateVideoResponse {
        let principal = match self.state.verifier.verify(&auth.0.token) {
            Ok(principal) => principal,
            Err(e) => return CreateVideoResponse::Unauthorized(Json(ErrorBody::new(e))),
        };
        let CreateVideoRequest { title, description } = body.0;
        if title.trim().is_empty() {
            return CreateVideoResponse::BadRequest(Json(ErrorBody::new("title is required")));
        }

        match self
            .state
            .videos
            .create_video(VideoRecord::new(principal.user_id, title, description))
            .await
        {
            Ok(record) => {
                tracing::info!(
                    video_id = %record.id,
                    user_id = %principal.user_id,
                    "Video created"
                );
                CreateVideoResponse::Created(Json(record))
            }
            Err(e) => {
                tracing::error!(error = %e, "Couldn't create video");
                CreateVideoResponse::InternalError(Json(ErrorBody::new(e)))
            }
        }
    }

    pub async fn get_video_impl(&self, video_id: Path<Uuid>) -> GetVideoResponse {
        match self.state.videos.get_video(video_id.0).await {
            Ok(record) => GetVideoResponse::OK(Json(record)),
            Err(e @ StoreError::NotFound(_)) => GetVideoResponse::NotFound(Json(ErrorBody::new(e))),
            Err(e) => GetVideoResponse::InternalError(Json(ErrorBody::new(e))),
        }
    }
}
