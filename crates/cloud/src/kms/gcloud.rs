//! Cloud KMS backend using the gcloud CLI.
//!
//! Runs `gcloud kms encrypt|decrypt --key <name>` with the payload on stdin
//! and reads the result from stdout, so no payload ever touches disk.
//!
//! ## Requirements
//!
//! - `gcloud` must be installed and authenticated
//! - The caller needs `cloudkms.cryptoKeyVersions.useToEncrypt` and
//!   `useToDecrypt` on the key
//!
//! The key is the full resource name:
//! `projects/P/locations/L/keyRings/R/cryptoKeys/K`

use async_trait::async_trait;
use tracing::trace;

use kmstool_core::{CryptoGateway, Direction, Error, Result};

use crate::process;

/// Cloud KMS gateway backed by the gcloud CLI
#[derive(Debug, Clone)]
pub struct GcloudKms {
    program: String,
}

impl GcloudKms {
    /// Use `program` as the gcloud executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, direction: Direction, key: &str, input: &[u8]) -> Result<Vec<u8>> {
        let (input_flag, output_flag) = match direction {
            Direction::Encrypt => ("--plaintext-file", "--ciphertext-file"),
            Direction::Decrypt => ("--ciphertext-file", "--plaintext-file"),
        };

        let command = direction.to_string();
        trace!(key, %direction, input_len = input.len(), "calling gcloud kms");

        let child = process::spawn(
            &self.program,
            &["kms", command.as_str(), "--key", key, input_flag, "-", output_flag, "-"],
        )
        .map_err(|e| Error::RemoteClient(format!("failed to launch {}: {e}", self.program)))?;

        let (output, fed) = process::feed_and_wait(child, input)
            .await
            .map_err(|e| Error::Crypto(format!("{} did not complete: {e}", self.program)))?;
        if !output.status.success() {
            return Err(Error::Crypto(format!(
                "gcloud kms {direction} failed ({}): {}",
                output.status,
                process::stderr_text(&output)
            )));
        }
        fed.map_err(|e| Error::Crypto(format!("failed to send payload to gcloud: {e}")))?;

        trace!(output_len = output.stdout.len(), "gcloud kms finished");
        Ok(output.stdout)
    }
}

#[async_trait]
impl CryptoGateway for GcloudKms {
    async fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.run(Direction::Encrypt, key, plaintext).await
    }

    async fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.run(Direction::Decrypt, key, ciphertext).await
    }
}
