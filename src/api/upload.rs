use std::path::Path as FsPath;
use std::sync::Arc;

use poem::error::ResponseError;
use poem::http::{header, HeaderMap};
use poem::web::{Data, Json, Multipart, Path};
use poem::{handler, Body, FromRequest, Request, RequestBody};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::AppState;
use crate::auth::{self, Principal};
use crate::db::VideoRecord;
use crate::error::UploadError;
use crate::media::{AssetKind, MediaType};
use crate::storage::{AssetBody, AssetStore, StorageError};

/// Allowance for multipart boundaries and part headers on top of the file limit.
const MULTIPART_ENVELOPE_BYTES: u64 = 64 << 10;

const SPOOL_CHUNK_BYTES: usize = 64 << 10;

/// A validated file part, ready to be written.
#[derive(Debug)]
pub struct UploadedAsset {
    pub body: AssetBody,
    pub media_type: MediaType,
}

#[handler]
pub async fn upload_thumbnail(
    req: &Request,
    Path(video_id): Path<String>,
    state: Data<&Arc<AppState>>,
    body: Body,
) -> Result<Json<VideoRecord>, UploadError> {
    let store = state.thumbnails.clone();
    handle_upload(&state, store.as_ref(), req, &video_id, body, AssetKind::Thumbnail)
        .await
        .map(Json)
}

#[handler]
pub async fn upload_video(
    req: &Request,
    Path(video_id): Path<String>,
    state: Data<&Arc<AppState>>,
    body: Body,
) -> Result<Json<VideoRecord>, UploadError> {
    let store = state.video_assets.clone();
    handle_upload(&state, store.as_ref(), req, &video_id, body, AssetKind::Video)
        .await
        .map(Json)
}

async fn handle_upload(
    state: &AppState,
    store: &dyn AssetStore,
    req: &Request,
    raw_id: &str,
    body: Body,
    kind: AssetKind,
) -> Result<VideoRecord, UploadError> {
    let result = run_upload(state, store, req, raw_id, body, kind).await;
    if let Err(ref e) = result {
        if e.status().is_server_error() {
            tracing::error!(video_id = raw_id, ?kind, error = %e, "Upload failed");
        } else {
            // Debug form, so an unknown id is told apart from a foreign one in logs.
            tracing::warn!(video_id = raw_id, ?kind, error = ?e, "Upload rejected");
        }
    }
    result
}

async fn run_upload(
    state: &AppState,
    store: &dyn AssetStore,
    req: &Request,
    raw_id: &str,
    body: Body,
    kind: AssetKind,
) -> Result<VideoRecord, UploadError> {
    let (principal, record) = authorize(state, raw_id, req.headers()).await?;
    let asset = read_asset(req, body, kind, &state.spool_dir).await?;
    let size = asset.body.size();
    let record = persist(state, store, record, asset, kind).await?;
    tracing::info!(
        video_id = %record.id,
        user_id = %principal.user_id,
        ?kind,
        size_bytes = size,
        "Upload registered"
    );
    Ok(record)
}

/// Identity, record lookup and ownership. Touches nothing but the metadata store.
async fn authorize(
    state: &AppState,
    raw_id: &str,
    headers: &HeaderMap,
) -> Result<(Principal, VideoRecord), UploadError> {
    let video_id = Uuid::parse_str(raw_id)
        .map_err(|_| UploadError::InvalidIdentifier(raw_id.to_string()))?;
    let token = auth::bearer_token(headers)?;
    let principal = state.verifier.verify(token)?;

    // A failed lookup ends the request here; it is never treated as a pass.
    let record = state.videos.get_video(video_id).await?;
    if record.user_id != principal.user_id {
        return Err(UploadError::Forbidden);
    }
    Ok((principal, record))
}

/// Finds the kind's form field, reads at most its size limit, then checks its type.
/// Thumbnails are buffered in memory; videos are spooled under `spool_dir`.
async fn read_asset(
    req: &Request,
    body: Body,
    kind: AssetKind,
    spool_dir: &FsPath,
) -> Result<UploadedAsset, UploadError> {
    let limit = kind.max_bytes();
    let declared_len = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if matches!(declared_len, Some(len) if len > limit + MULTIPART_ENVELOPE_BYTES) {
        return Err(UploadError::PayloadTooLarge { limit });
    }

    let mut multipart = Multipart::from_request(req, &mut RequestBody::new(body))
        .await
        .map_err(|e| UploadError::MalformedMultipart(e.to_string()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::MalformedMultipart(e.to_string()))?
    {
        if field.name() != Some(kind.form_field()) {
            continue;
        }
        let declared_type = field.content_type().map(str::to_string);

        let reader = field.into_async_read();
        tokio::pin!(reader);
        let body = match kind {
            AssetKind::Thumbnail => buffer_part(reader, limit).await?,
            AssetKind::Video => spool_part(reader, limit, spool_dir).await?,
        };

        // Dropping a spooled body here removes its file.
        let media_type = kind.validate(declared_type.as_deref())?;
        return Ok(UploadedAsset { body, media_type });
    }

    Err(UploadError::MalformedMultipart(format!(
        "missing form field {:?}",
        kind.form_field()
    )))
}

async fn buffer_part(
    reader: impl AsyncRead + Unpin,
    limit: u64,
) -> Result<AssetBody, UploadError> {
    let mut data = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut data)
        .await
        .map_err(|e| UploadError::MalformedMultipart(e.to_string()))?;
    if data.len() as u64 > limit {
        return Err(UploadError::PayloadTooLarge { limit });
    }
    Ok(AssetBody::Bytes(data.into()))
}

/// Copies the part into a temp file in `spool_dir`, stopping as soon as it
/// passes `limit`. The file is deleted on every early return.
async fn spool_part(
    mut reader: impl AsyncRead + Unpin,
    limit: u64,
    spool_dir: &FsPath,
) -> Result<AssetBody, UploadError> {
    let (file, path) = tempfile::Builder::new()
        .prefix("video-upload-")
        .tempfile_in(spool_dir)
        .map_err(StorageError::from)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut buf = vec![0u8; SPOOL_CHUNK_BYTES];
    let mut size = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| UploadError::MalformedMultipart(e.to_string()))?;
        if n == 0 {
            break;
        }
        size += n as u64;
        if size > limit {
            return Err(UploadError::PayloadTooLarge { limit });
        }
        file.write_all(&buf[..n]).await.map_err(StorageError::from)?;
    }
    file.flush().await.map_err(StorageError::from)?;

    tracing::debug!(path = %path.display(), size_bytes = size, "Video part spooled");
    Ok(AssetBody::File { path, size })
}

/// Writes the asset once and records its URL. A failed record update leaves
/// the stored asset in place.
async fn persist(
    state: &AppState,
    store: &dyn AssetStore,
    mut record: VideoRecord,
    asset: UploadedAsset,
    kind: AssetKind,
) -> Result<VideoRecord, UploadError> {
    let key = state.keys.generate(&asset.media_type);
    let url = store
        .store(record.id, &key, asset.body, &asset.media_type)
        .await?;

    match kind {
        AssetKind::Thumbnail => record.thumbnail_url = Some(url),
        AssetKind::Video => record.video_url = Some(url),
    }
    record.touch();

    state
        .videos
        .update_video(&record)
        .await
        .map_err(|e| UploadError::UpdateFailed(e.to_string()))?;
    Ok(record)
}
