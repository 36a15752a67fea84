//! Key management backends
//!
//! - **gcp**: Cloud KMS through the `gcloud` CLI (default).
//! - **aws**: AWS KMS through aws-sdk-kms.
//!
//! Both implement [`CryptoGateway`] and treat the key name as opaque; the
//! service is the only place it gets validated.

use std::sync::Arc;

use kmstool_core::{CryptoGateway, KmsConfig, KmsProvider};

mod aws;
mod gcloud;

pub use aws::AwsKms;
pub use gcloud::GcloudKms;

/// Build the gateway selected by `config`
pub fn gateway(config: &KmsConfig) -> Arc<dyn CryptoGateway> {
    match config.provider {
        KmsProvider::Gcp => Arc::new(GcloudKms::new(&config.gcloud)),
        KmsProvider::Aws => Arc::new(AwsKms::new()),
    }
}
