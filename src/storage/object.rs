use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStore, PutOptions, PutPayload,
};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{check_key, AssetBody, AssetStore, StorageError, StorageResult, StoredAsset};
use crate::media::MediaType;

/// Assets in a remote bucket. In-memory bodies go up in one `put`, spooled
/// files are streamed as a multipart upload. No retries.
pub struct ObjectAssetStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl ObjectAssetStore {
    /// S3 (or an S3-compatible provider when `endpoint_url` is set), with
    /// credentials taken from the usual `AWS_*` environment variables.
    pub fn s3(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder.build()?;
        Ok(Self::with_store(Arc::new(store), bucket, region, endpoint_url))
    }

    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Self {
        Self {
            store,
            bucket,
            region,
            endpoint_url,
        }
    }

    /// Virtual-hosted AWS URLs, or path-style under a custom endpoint.
    fn public_url(&self, key: &str) -> String {
        match self.endpoint_url {
            Some(ref endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }

    async fn stream_file(
        &self,
        location: Path,
        spooled: &std::path::Path,
        attributes: Attributes,
    ) -> StorageResult<()> {
        let mut file = tokio::fs::File::open(spooled).await?;
        let mut writer =
            BufWriter::new(self.store.clone(), location).with_attributes(attributes);
        if let Err(e) = tokio::io::copy(&mut file, &mut writer).await {
            if let Err(abort) = writer.abort().await {
                tracing::warn!(error = %abort, "Couldn't abort multipart upload");
            }
            return Err(e.into());
        }
        // Completes the upload; abort is no longer possible past this point.
        writer.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStore for ObjectAssetStore {
    async fn store(
        &self,
        video_id: Uuid,
        key: &str,
        body: AssetBody,
        media_type: &MediaType,
    ) -> StorageResult<String> {
        check_key(key)?;
        let location = Path::from(key);
        let size = body.size();
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, media_type.essence().into());

        let result = match body {
            AssetBody::Bytes(data) => {
                let opts = PutOptions {
                    attributes,
                    ..Default::default()
                };
                self.store
                    .put_opts(&location, PutPayload::from(data), opts)
                    .await
                    .map(|_| ())
                    .map_err(StorageError::from)
            }
            AssetBody::File { path, .. } => self.stream_file(location, &path, attributes).await,
        };
        if let Err(ref e) = result {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                "Object upload failed"
            );
        }
        result?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            %video_id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object upload successful"
        );
        Ok(self.public_url(key))
    }

    async fn retrieve(&self, key: &str) -> StorageResult<StoredAsset> {
        check_key(key)?;
        let result = match self
            .store
            .get_opts(&Path::from(key), GetOptions::default())
            .await
        {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let media_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = result.bytes().await?;
        Ok(StoredAsset { data, media_type })
    }
}
