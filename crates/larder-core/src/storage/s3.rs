//! S3-compatible object storage configuration and client.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client};
use aws_types::region::Region;

use crate::models::AttachmentRef;
use crate::{Error, Result};

use super::BlobStore;

const ENV_ENDPOINT: &str = "LARDER_S3_ENDPOINT";
const ENV_ACCESS_KEY_ID: &str = "LARDER_S3_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "LARDER_S3_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "LARDER_S3_PUBLIC_BASE_URL";

/// S3-compatible object store configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    /// S3-compatible endpoint URL.
    pub endpoint_url: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Optional public URL base for serving objects without signing.
    pub public_base_url: Option<String>,
}

impl ObjectStoreConfig {
    /// Load object store configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no storage variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }
}

/// S3-backed blob store.
#[derive(Clone, Debug)]
pub struct S3BlobStore {
    config: ObjectStoreConfig,
    client: Client,
}

impl S3BlobStore {
    #[must_use]
    pub fn new(config: ObjectStoreConfig) -> Self {
        let client = build_s3_client(&config);
        Self { config, client }
    }

    #[must_use]
    pub const fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// Resolve a public URL for an object when a public base URL is configured.
    #[must_use]
    pub fn public_object_url(&self, bucket: &str, path: &str) -> Option<String> {
        let base = self.config.public_base_url.as_ref()?;
        let bucket = bucket.trim().trim_matches('/');
        let path = path.trim().trim_matches('/');
        if bucket.is_empty() || path.is_empty() {
            return None;
        }

        Some(format!("{base}/{bucket}/{path}"))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<AttachmentRef> {
        let path = normalize_object_path(path)?;

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(&path)
            .body(ByteStream::from(bytes.to_vec()));

        if let Some(content_type) = normalize_content_type(content_type) {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .map_err(|error| storage_error("put_object", bucket, Some(&path), error))?;

        AttachmentRef::new(bucket, path)
    }

    async fn signed_url(&self, bucket: &str, path: &str, ttl: Duration) -> Result<String> {
        let path = normalize_object_path(path)?;

        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|error| storage_error("presign_config", bucket, Some(&path), error))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(&path)
            .presigned(presigning)
            .await
            .map_err(|error| storage_error("presign_get_object", bucket, Some(&path), error))?;

        Ok(presigned.uri().to_string())
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<()> {
        let path = normalize_object_path(path)?;

        self.client
            .delete_object()
            .bucket(bucket)
            .key(&path)
            .send()
            .await
            .map_err(|error| storage_error("delete_object", bucket, Some(&path), error))?;

        Ok(())
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<ObjectStoreConfig>> {
    let endpoint_url = lookup(ENV_ENDPOINT).map(|value| value.trim().to_string());
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).map(|value| value.trim().to_string());
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).map(|value| value.trim().to_string());
    let public_base_url = lookup(ENV_PUBLIC_BASE_URL).map(|value| value.trim().to_string());

    let any_present = endpoint_url.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || public_base_url.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if endpoint_url.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_ENDPOINT);
    }
    if access_key_id.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_ACCESS_KEY_ID);
    }
    if secret_access_key.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_SECRET_ACCESS_KEY);
    }

    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Object store configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    let endpoint_url = normalize_http_url(endpoint_url.expect("validated above"), ENV_ENDPOINT)?;
    let public_base_url = match public_base_url.filter(|value| !value.is_empty()) {
        Some(value) => Some(normalize_http_url(value, ENV_PUBLIC_BASE_URL)?),
        None => None,
    };

    Ok(Some(ObjectStoreConfig {
        endpoint_url,
        access_key_id: access_key_id.expect("validated above"),
        secret_access_key: secret_access_key.expect("validated above"),
        public_base_url,
    }))
}

fn build_s3_client(config: &ObjectStoreConfig) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "larder-core-object-store",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint_url)
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    path: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = path.map_or_else(|| bucket.to_string(), |path| format!("{bucket}/{path}"));
    Error::Storage(format!("S3 {operation} failed for {target}: {error}"))
}

fn normalize_object_path(path: &str) -> Result<String> {
    let path = path.trim().trim_matches('/').to_string();
    if path.is_empty() {
        return Err(Error::InvalidInput(
            "Attachment path cannot be empty".to_string(),
        ));
    }
    Ok(path)
}

fn normalize_content_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn normalize_http_url(value: String, field: &str) -> Result<String> {
    if !value.starts_with("https://") && !value.starts_with("http://") {
        return Err(Error::InvalidInput(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}
