//! Cloud Storage through the gcloud CLI
//!
//! Used for gs:// objects when no HMAC keys are configured. `gcloud storage`
//! authenticates with the active gcloud account or application default
//! credentials, the same way the KMS backend does.
//!
//! - read: `gcloud storage cat gs://bucket/object`
//! - write: `gcloud storage cp - gs://bucket/object`, payload on stdin

use async_trait::async_trait;
use tokio::process::Child;
use tracing::trace;

use kmstool_core::{
    Error, ObjectReader, ObjectStore, ObjectWriter, RemotePath, Result, StoreConnector,
};

use crate::process;

/// Object store and connector backed by `gcloud storage`
#[derive(Debug, Clone)]
pub struct GcloudStorage {
    program: String,
}

impl GcloudStorage {
    /// Use `program` as the gcloud executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn launch(&self, args: &[&str]) -> Result<Child> {
        process::spawn(&self.program, args)
            .map_err(|e| Error::RemoteClient(format!("failed to launch {}: {e}", self.program)))
    }
}

#[async_trait]
impl StoreConnector for GcloudStorage {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ObjectStore for GcloudStorage {
    async fn open_reader(&self, path: &RemotePath) -> Result<Box<dyn ObjectReader>> {
        let url = path.to_string();
        trace!(%url, "gcloud storage cat");
        let child = self.launch(&["storage", "cat", url.as_str()])?;
        Ok(Box::new(GcloudReader {
            url,
            child: Some(child),
        }))
    }

    async fn open_writer(&self, path: &RemotePath) -> Result<Box<dyn ObjectWriter>> {
        Ok(Box::new(GcloudWriter {
            store: self.clone(),
            url: path.to_string(),
            buffer: Vec::new(),
        }))
    }
}

/// Running `gcloud storage cat`; dropping it kills the process
struct GcloudReader {
    url: String,
    child: Option<Child>,
}

#[async_trait]
impl ObjectReader for GcloudReader {
    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let child = self
            .child
            .take()
            .ok_or_else(|| Error::remote_io(&self.url, "object body already consumed"))?;

        let (output, _) = process::feed_and_wait(child, &[])
            .await
            .map_err(|e| Error::remote_io(&self.url, e.to_string()))?;
        if !output.status.success() {
            return Err(Error::remote_io(&self.url, process::stderr_text(&output)));
        }
        Ok(output.stdout)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}

/// Buffers the payload and uploads it with one `gcloud storage cp` on finalize
struct GcloudWriter {
    store: GcloudStorage,
    url: String,
    buffer: Vec<u8>,
}

#[async_trait]
impl ObjectWriter for GcloudWriter {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<()> {
        trace!(url = %self.url, len = self.buffer.len(), "gcloud storage cp");
        let child = self.store.launch(&["storage", "cp", "-", self.url.as_str()])?;

        let (output, fed) = process::feed_and_wait(child, &self.buffer)
            .await
            .map_err(|e| Error::remote_io(&self.url, e.to_string()))?;
        if !output.status.success() {
            return Err(Error::remote_io(&self.url, process::stderr_text(&output)));
        }
        fed.map_err(|e| Error::remote_io(&self.url, format!("upload was cut short: {e}")))
    }
}
