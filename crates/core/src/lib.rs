//! kmstool-core: Core library for the kmstool CLI
//!
//! This crate provides the core functionality for kmstool, including:
//! - Path classification (local path vs gs://bucket/key)
//! - Storage accessor reading and writing whole payloads
//! - Execution context for cancellation and deadlines
//! - Configuration loading and merging
//! - The encrypt/decrypt pipeline
//!
//! This crate is independent of any cloud SDK; object stores and KMS
//! backends plug in through the traits in [`traits`].

pub mod config;
pub mod context;
pub mod error;
pub mod path;
pub mod pipeline;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigManager, KmsConfig, KmsProvider, Overrides, StorageConfig};
pub use context::Context;
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use path::{Location, RemotePath, classify};
pub use pipeline::{Direction, Job, Pipeline};
pub use storage::Storage;
pub use traits::{CryptoGateway, ObjectReader, ObjectStore, ObjectWriter, StoreConnector};
