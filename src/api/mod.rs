use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use poem::endpoint::StaticFilesEndpoint;
use poem::{post, Endpoint, EndpointExt, Route};
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::{OpenApi, OpenApiService};
use uuid::Uuid;

use crate::auth::CredentialVerifier;
use crate::db::VideoStore;
use crate::storage::disk::ASSETS_ROUTE;
use crate::storage::{AssetStore, KeyGenerator};

pub mod health;
pub mod thumbnails;
pub mod upload;
pub mod videos;

/// Collaborators shared by every request, built once in `main`.
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub videos: Arc<dyn VideoStore>,
    pub thumbnails: Arc<dyn AssetStore>,
    pub video_assets: Arc<dyn AssetStore>,
    pub keys: Arc<dyn KeyGenerator>,
    /// Where video parts are spooled before they are handed to a backend.
    pub spool_dir: PathBuf,
}

pub struct Api {
    pub state: Arc<AppState>,
}

#[OpenApi]
impl Api {
    /// Return the health of the service as HTTP 200 status. Useful to check if everything is configured correctly.
    #[oai(path = "/health", method = "get")]
    async fn health_check(&self) -> health::HealthCheckResponse {
        self.health_check_impl()
    }

    /// Create a draft video owned by the caller. Assets are attached with the upload routes.
    #[oai(path = "/videos", method = "post")]
    async fn create_video(
        &self,
        auth: videos::BearerAuth,
        body: Json<videos::CreateVideoRequest>,
    ) -> videos::CreateVideoResponse {
        self.create_video_impl(auth, body).await
    }

    /// Fetch a video record, including the URLs of its uploaded assets.
    #[oai(path = "/videos/:video_id", method = "get")]
    async fn get_video(&self, video_id: Path<Uuid>) -> videos::GetVideoResponse {
        self.get_video_impl(video_id).await
    }

    /// Serve a thumbnail held by the in-memory backend, with the media type it was uploaded as.
    #[oai(path = "/thumbnails/:video_id", method = "get")]
    async fn get_thumbnail(&self, video_id: Path<Uuid>) -> thumbnails::ThumbnailResponse {
        self.get_thumbnail_impl(video_id).await
    }
}

/// All routes. `server_url` is the public address of the `/api` prefix, used
/// in the generated OpenAPI document.
pub fn app(state: Arc<AppState>, assets_root: &FsPath, server_url: &str) -> impl Endpoint {
    let api_service = OpenApiService::new(
        Api {
            state: state.clone(),
        },
        "Video Upload Server API",
        "1.0",
    )
    .server(server_url);
    let ui = api_service.swagger_ui();
    let spec = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();

    Route::new()
        .at("/api/thumbnail_upload/:video_id", post(upload::upload_thumbnail))
        .at("/api/video_upload/:video_id", post(upload::upload_video))
        .nest("/api", api_service)
        .nest(ASSETS_ROUTE, StaticFilesEndpoint::new(assets_root))
        .nest("/", ui)
        .at("/spec", spec)
        .at("/spec_yaml", spec_yaml)
        .data(state)
}
