//! Cloud Storage client implementation
//!
//! Wraps aws-sdk-s3 pointed at the Cloud Storage XML API and implements the
//! object store traits from kmstool-core.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use kmstool_core::{
    Error, ObjectReader, ObjectStore, ObjectWriter, RemotePath, Result, StorageConfig,
    StoreConnector,
};

/// Cloud Storage client wrapper
pub struct GcsClient {
    inner: aws_sdk_s3::Client,
}

impl GcsClient {
    /// Create a new client from the storage configuration
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::RemoteClient(e.to_string()))?;
        if config.is_default_endpoint() && !config.has_hmac() {
            return Err(Error::RemoteClient(format!(
                "{} only accepts HMAC keys; set storage.access_key and storage.secret_key",
                config.endpoint
            )));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint);

        // HMAC keys when configured; emulators may rely on the SDK default chain
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "kmstool-hmac",
            );
            loader = loader.credentials_provider(credentials);
        }

        let sdk_config = loader.load().await;

        // The XML API rejects the SDK's flexible checksum headers
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .request_checksum_calculation(
                aws_sdk_s3::config::RequestChecksumCalculation::WhenRequired,
            )
            .response_checksum_validation(
                aws_sdk_s3::config::ResponseChecksumValidation::WhenRequired,
            )
            .build();

        debug!(endpoint = %config.endpoint, "created storage client");
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn open_reader(&self, path: &RemotePath) -> Result<Box<dyn ObjectReader>> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    Error::remote_io(path, "object does not exist")
                } else {
                    Error::remote_io(path, DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(Box::new(GcsObjectReader {
            path: path.to_string(),
            body: Some(response.body),
        }))
    }

    async fn open_writer(&self, path: &RemotePath) -> Result<Box<dyn ObjectWriter>> {
        Ok(Box::new(GcsObjectWriter {
            inner: self.inner.clone(),
            path: path.clone(),
            buffer: Vec::new(),
        }))
    }
}

/// Streaming body of a GET; dropping it releases the connection
struct GcsObjectReader {
    path: String,
    body: Option<ByteStream>,
}

#[async_trait]
impl ObjectReader for GcsObjectReader {
    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let body = self
            .body
            .take()
            .ok_or_else(|| Error::remote_io(&self.path, "object body already consumed"))?;

        let data = body
            .collect()
            .await
            .map_err(|e| Error::remote_io(&self.path, e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}

/// Buffers the payload and uploads it in one PUT on finalize
struct GcsObjectWriter {
    inner: aws_sdk_s3::Client,
    path: RemotePath,
    buffer: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for GcsObjectWriter {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<()> {
        let GcsObjectWriter {
            inner,
            path,
            buffer,
        } = *self;

        inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_type("application/octet-stream")
            .body(ByteStream::from(buffer))
            .send()
            .await
            .map_err(|e| Error::remote_io(&path, DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}

/// Builds a new [`GcsClient`] on every storage call
#[derive(Debug, Clone)]
pub struct GcsConnector {
    config: StorageConfig,
}

impl GcsConnector {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreConnector for GcsConnector {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>> {
        let client = GcsClient::new(&self.config).await?;
        Ok(Box::new(client))
    }
}
