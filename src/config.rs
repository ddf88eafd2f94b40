use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8091;
const DEFAULT_ASSETS_ROOT: &str = "./assets";

/// Where one kind of asset is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Disk,
    Memory,
    S3,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" | "local" => Ok(BackendKind::Disk),
            "memory" => Ok(BackendKind::Memory),
            "s3" => Ok(BackendKind::S3),
            other => Err(anyhow!("unknown storage backend {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub assets_root: PathBuf,
    /// Temporary home of video uploads until the backend has them.
    pub spool_dir: PathBuf,
    pub public_base_url: String,
    pub thumbnail_storage: BackendKind,
    pub video_storage: BackendKind,
    pub s3: Option<S3Config>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT {:?}", p))?,
            None => DEFAULT_PORT,
        };
        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let assets_root = PathBuf::from(
            var("ASSETS_ROOT").unwrap_or_else(|| DEFAULT_ASSETS_ROOT.to_string()),
        );
        let spool_dir = var("UPLOAD_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();
        let thumbnail_storage = match var("THUMBNAIL_STORAGE") {
            Some(v) => v.parse().context("invalid THUMBNAIL_STORAGE")?,
            None => BackendKind::Disk,
        };
        let video_storage = match var("VIDEO_STORAGE") {
            Some(v) => v.parse().context("invalid VIDEO_STORAGE")?,
            None => BackendKind::S3,
        };
        if video_storage == BackendKind::Memory {
            bail!("VIDEO_STORAGE=memory is not supported, in-memory storage only holds thumbnails");
        }

        let s3 = if thumbnail_storage == BackendKind::S3 || video_storage == BackendKind::S3 {
            let (Some(bucket), Some(region)) = (var("S3_BUCKET"), var("S3_REGION")) else {
                bail!("S3_BUCKET and S3_REGION must be set when an s3 backend is selected");
            };
            Some(S3Config {
                bucket,
                region,
                endpoint: var("S3_ENDPOINT"),
            })
        } else {
            None
        };

        Ok(Self {
            host,
            port,
            jwt_secret,
            assets_root,
            spool_dir,
            public_base_url,
            thumbnail_storage,
            video_storage,
            s3,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
