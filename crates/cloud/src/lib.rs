//! kmstool-cloud: Cloud adapters for kmstool
//!
//! This crate provides the object stores for gs:// paths and the KMS
//! gateways. It is the only crate that directly depends on cloud SDKs.
//!
//! gs:// objects go through the Cloud Storage XML API (aws-sdk-s3) when HMAC
//! keys are configured or the endpoint points elsewhere, and through the
//! gcloud CLI otherwise.

use std::sync::Arc;

use kmstool_core::{StorageConfig, StoreConnector};

pub mod client;
pub mod gcloud_store;
pub mod kms;
mod process;

pub use client::{GcsClient, GcsConnector};
pub use gcloud_store::GcloudStorage;

/// Pick the object store backend for `config`
pub fn connector(config: &StorageConfig) -> Arc<dyn StoreConnector> {
    if config.has_hmac() || !config.is_default_endpoint() {
        tracing::debug!(endpoint = %config.endpoint, "using the XML API for gs://");
        Arc::new(GcsConnector::new(config.clone()))
    } else {
        tracing::debug!(gcloud = %config.gcloud, "using gcloud storage for gs://");
        Arc::new(GcloudStorage::new(&config.gcloud))
    }
}
