//! AWS KMS backend.
//!
//! Uses AWS credentials from the environment or the default provider chain.
//! The key may be a key ID, key ARN, alias name or alias ARN.

use async_trait::async_trait;
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use tracing::trace;

use kmstool_core::{CryptoGateway, Error, Result};

/// AWS KMS gateway; a client is built for every call
#[derive(Debug, Clone, Default)]
pub struct AwsKms;

impl AwsKms {
    pub fn new() -> Self {
        Self
    }

    async fn client() -> aws_sdk_kms::Client {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        aws_sdk_kms::Client::new(&config)
    }
}

#[async_trait]
impl CryptoGateway for AwsKms {
    async fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        trace!(key, plaintext_len = plaintext.len(), "encrypting with AWS KMS");

        let result = Self::client()
            .await
            .encrypt()
            .key_id(key)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .map_err(|e| Error::Crypto(format!("KMS encrypt failed: {}", DisplayErrorContext(&e))))?;

        let blob = result
            .ciphertext_blob()
            .ok_or_else(|| Error::Crypto("no ciphertext returned".into()))?;

        trace!(ciphertext_len = blob.as_ref().len(), "encrypted with AWS KMS");
        Ok(blob.as_ref().to_vec())
    }

    async fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(key, ciphertext_len = ciphertext.len(), "decrypting with AWS KMS");

        let result = Self::client()
            .await
            .decrypt()
            .key_id(key)
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| Error::Crypto(format!("KMS decrypt failed: {}", DisplayErrorContext(&e))))?;

        let blob = result
            .plaintext()
            .ok_or_else(|| Error::Crypto("no plaintext returned".into()))?;

        trace!(plaintext_len = blob.as_ref().len(), "decrypted with AWS KMS");
        Ok(blob.as_ref().to_vec())
    }
}
