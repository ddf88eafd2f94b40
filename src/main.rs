use std::sync::Arc;

use anyhow::Context;
use poem::{listener::TcpListener, middleware::TowerLayerCompatExt, EndpointExt, Server};
use tower::limit::RateLimitLayer;
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod db;
mod error;
mod media;
mod storage;

use config::{BackendKind, Config};
use storage::{AssetStore, DiskAssetStore, MemoryAssetStore, ObjectAssetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log init
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_line_number(true)
        .with_file(true)
        .init();

    let config = Config::from_env()?;

    // The assets directory is always served, whichever backends are in use.
    let disk = DiskAssetStore::new(&config.assets_root, &config.public_base_url)
        .await
        .with_context(|| format!("creating {}", config.assets_root.display()))?;
    tokio::fs::create_dir_all(&config.spool_dir)
        .await
        .with_context(|| format!("creating {}", config.spool_dir.display()))?;

    let state = Arc::new(api::AppState {
        verifier: Arc::new(auth::JwtVerifier::new(&config.jwt_secret)),
        videos: Arc::new(db::MemoryVideoStore::new()),
        thumbnails: backend(&config, config.thumbnail_storage, &disk)?,
        video_assets: backend(&config, config.video_storage, &disk)?,
        keys: Arc::new(storage::RandomKeyGenerator),
        spool_dir: config.spool_dir.clone(),
    });

    tracing::info!(
        addr = %config.listen_addr(),
        thumbnails = ?config.thumbnail_storage,
        videos = ?config.video_storage,
        "Starting video upload server"
    );

    // Rate limit up to 1000 req in 30 seconds
    let app = api::app(
        state,
        disk.root(),
        &format!("{}/api", config.public_base_url),
    )
    .with(RateLimitLayer::new(1000, std::time::Duration::from_secs(30)).compat());

    Server::new(TcpListener::bind(config.listen_addr()))
        .run(app)
        .await
        .context("server error")
}

fn backend(
    config: &Config,
    kind: BackendKind,
    disk: &DiskAssetStore,
) -> anyhow::Result<Arc<dyn AssetStore>> {
    Ok(match kind {
        BackendKind::Disk => Arc::new(disk.clone()),
        BackendKind::Memory => Arc::new(MemoryAssetStore::new(&config.public_base_url)),
        BackendKind::S3 => {
            let s3 = config
                .s3
                .clone()
                .context("s3 backend selected without S3 settings")?;
            Arc::new(
                ObjectAssetStore::s3(s3.bucket, s3.region, s3.endpoint)
                    .context("building S3 client")?,
            )
        }
    })
}
