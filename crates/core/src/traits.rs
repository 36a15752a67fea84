//! Storage and KMS trait definitions
//!
//! These traits decouple the storage accessor and the pipeline from any
//! specific cloud SDK. The cloud crate implements them; tests substitute
//! in-memory stores and mocks.

use async_trait::async_trait;

use crate::error::Result;
use crate::path::RemotePath;

/// An open handle on a remote object being read
#[async_trait]
pub trait ObjectReader: Send {
    /// Read the remaining object content into memory
    async fn read_to_end(&mut self) -> Result<Vec<u8>>;

    /// Release the underlying connection
    async fn close(self: Box<Self>) -> Result<()>;
}

/// An open handle on a remote object being written
///
/// Data is not committed until [`ObjectWriter::finalize`] succeeds. Dropping
/// a writer without finalizing discards what was written.
#[async_trait]
pub trait ObjectWriter: Send {
    /// Append `data` to the object
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Commit the object and release the writer
    async fn finalize(self: Box<Self>) -> Result<()>;
}

/// Trait for object storage operations
///
/// Implemented by the Cloud Storage adapter and by test stubs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a reader on an existing object
    async fn open_reader(&self, path: &RemotePath) -> Result<Box<dyn ObjectReader>>;

    /// Open a writer that creates or replaces an object
    async fn open_writer(&self, path: &RemotePath) -> Result<Box<dyn ObjectWriter>>;
}

/// Builds a fresh store client for each storage call
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>>;
}

/// Remote key management operations
///
/// `key` is an opaque, fully qualified key reference understood by the
/// service. Both methods fail with a crypto error on any service refusal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CryptoGateway: Send + Sync {
    async fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    async fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>>;
}
