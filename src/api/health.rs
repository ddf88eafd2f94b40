use poem_openapi::ApiResponse;

#[derive(Debug, ApiResponse)]
pub enum HealthCheckResponse {
    /// OK
    #[oai(status = 200)]
    OK,
}

impl super::Api {
    pub fn health_check_impl(&self) -> HealthCheckResponse {
        HealthCheckResponse::OK
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use poem::test::TestClient;

    use crate::api::{app, AppState};
    use crate::auth::JwtVerifier;
    use crate::db::MemoryVideoStore;
    use crate::storage::{MemoryAssetStore, RandomKeyGenerator};

    #[tokio::test]
    async fn health_is_ok() {
        let assets = Arc::new(MemoryAssetStore::new("http://localhost"));
        let state = Arc::new(AppState {
            verifier: Arc::new(JwtVerifier::new("s")),
            videos: Arc::new(MemoryVideoStore::new()),
            thumbnails: assets.clone(),
            video_assets: assets,
            keys: Arc::new(RandomKeyGenerator),
            spool_dir: std::env::temp_dir(),
        });
        let cli = TestClient::new(app(state, std::env::temp_dir().as_path(), "/api"));
        cli.get("/api/health").send().await.assert_status_is_ok();
    }
}
