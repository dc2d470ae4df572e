use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::core::config::Settings;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredBlob {
    pub(crate) url: String,
    pub(crate) key: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
}

#[derive(Debug, Error)]
pub(crate) enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("timed out fetching {0}")]
    Timeout(String),
    #[error("blob transfer failed: {0}")]
    Transport(String),
    #[error("object storage is not configured")]
    NotConfigured,
}

/// URL-addressable blob store used for uploaded answer, key and question files.
#[async_trait::async_trait]
pub(crate) trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredBlob, BlobError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError>;
}

#[derive(Debug, Clone)]
struct Bucket {
    client: Client,
    name: String,
}

/// S3-compatible bucket for uploads. Downloads of URLs under the bucket's
/// public base go through `GetObject`; anything else is fetched over HTTP.
#[derive(Debug, Clone)]
pub(crate) struct ObjectStorage {
    bucket: Option<Bucket>,
    http: reqwest::Client,
    public_base: String,
}

impl ObjectStorage {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let s3 = settings.s3();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.storage().blob_fetch_timeout_seconds))
            .build()?;

        if !s3.is_configured() {
            tracing::warn!("S3 credentials not configured; uploads are disabled");
            return Ok(Self { bucket: None, http, public_base: s3.public_base_url() });
        }

        let creds = Credentials::new(
            s3.access_key.clone(),
            s3.secret_key.clone(),
            None,
            None,
            "smartgrade-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(s3.endpoint.clone())
            .region(aws_config::Region::new(s3.region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true).build();

        Ok(Self {
            bucket: Some(Bucket { client: Client::from_conf(s3_config), name: s3.bucket.clone() }),
            http,
            public_base: s3.public_base_url(),
        })
    }

    fn object_key<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }

    async fn get_object(&self, bucket: &Bucket, key: &str, url: &str) -> Result<Vec<u8>, BlobError> {
        let result = bucket.client.get_object().bucket(&bucket.name).key(key).send().await;
        let output = match result {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|service| service.is_no_such_key()) => {
                return Err(BlobError::NotFound(url.to_string()));
            }
            Err(err) => return Err(BlobError::Transport(format!("{err}"))),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| BlobError::Transport(format!("{err}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        let response = self.http.get(url).send().await.map_err(|err| map_reqwest(url, err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(BlobError::Transport(format!("GET {url} returned {status}")));
        }

        let bytes = response.bytes().await.map_err(|err| map_reqwest(url, err))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredBlob, BlobError> {
        let bucket = self.bucket.as_ref().ok_or(BlobError::NotConfigured)?;

        let key = object_key_for(folder, filename);
        let size = bytes.len() as i64;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        bucket
            .client
            .put_object()
            .bucket(&bucket.name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| BlobError::Transport(format!("{err}")))?;

        tracing::debug!(key = %key, size, "Uploaded blob");

        Ok(StoredBlob { url: format!("{}/{key}", self.public_base), key, size, sha256 })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BlobError> {
        match (&self.bucket, self.object_key(url)) {
            (Some(bucket), Some(key)) => self.get_object(bucket, key, url).await,
            _ => self.fetch_http(url).await,
        }
    }
}

fn map_reqwest(url: &str, err: reqwest::Error) -> BlobError {
    if err.is_timeout() {
        BlobError::Timeout(url.to_string())
    } else {
        BlobError::Transport(format!("{err}"))
    }
}

pub(crate) fn object_key_for(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    format!("{folder}/{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}

fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    #[test]
    fn object_keys_are_unique_and_sanitized() {
        let first = object_key_for("/submissions/", "../My Answer (1).pdf");
        let second = object_key_for("submissions", "../My Answer (1).pdf");
        assert!(first.starts_with("submissions/"));
        assert!(first.ends_with("-My_Answer__1_.pdf"));
        assert_ne!(first, second);
        assert!(object_key_for("keys", "...").ends_with("-file"));
    }

    #[tokio::test]
    async fn downloads_plain_urls_over_http() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");
        let storage = ObjectStorage::from_settings(&settings).await.expect("storage");

        let app = Router::new()
            .route("/files/key.pdf", get(|| async { "key-bytes" }))
            .route("/files/gone.pdf", get(|| async { AxumStatus::NOT_FOUND }))
            .route("/files/broken.pdf", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR }));
        let base = test_support::serve(app).await;

        let bytes = storage.download(&format!("{base}/files/key.pdf")).await.expect("download");
        assert_eq!(bytes, b"key-bytes");

        let missing = storage.download(&format!("{base}/files/gone.pdf")).await;
        assert!(matches!(missing, Err(BlobError::NotFound(_))));

        let broken = storage.download(&format!("{base}/files/broken.pdf")).await;
        assert!(matches!(broken, Err(BlobError::Transport(_))));
    }

    #[tokio::test]
    async fn upload_without_credentials_is_not_configured() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let settings = Settings::load().expect("settings");
        let storage = ObjectStorage::from_settings(&settings).await.expect("storage");

        let result = storage.upload("answers", "a.pdf", "application/pdf", b"%PDF".to_vec()).await;
        assert!(matches!(result, Err(BlobError::NotConfigured)));
    }
}
