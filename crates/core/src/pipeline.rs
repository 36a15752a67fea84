//! Encrypt/decrypt pipeline
//!
//! Reads the source payload, passes it through the KMS gateway and writes
//! the result to the destination. Steps run strictly in order and the first
//! failure aborts the run, so nothing is written unless both the read and
//! the KMS call succeed.

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result, ResultExt};
use crate::path::classify;
use crate::storage::Storage;
use crate::traits::CryptoGateway;

/// Which way the payload flows through the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn read_stage(self) -> &'static str {
        match self {
            Direction::Encrypt => "reading plaintext",
            Direction::Decrypt => "reading ciphertext",
        }
    }

    fn transform_stage(self) -> &'static str {
        match self {
            Direction::Encrypt => "encrypting plaintext",
            Direction::Decrypt => "decrypting ciphertext",
        }
    }

    fn write_stage(self) -> &'static str {
        match self {
            Direction::Encrypt => "writing ciphertext",
            Direction::Decrypt => "writing plaintext",
        }
    }

    /// Call the gateway operation matching this direction
    pub async fn apply(
        self,
        gateway: &dyn CryptoGateway,
        key: &str,
        input: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            Direction::Encrypt => gateway.encrypt(key, input).await,
            Direction::Decrypt => gateway.decrypt(key, input).await,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Encrypt => write!(f, "encrypt"),
            Direction::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Validated parameters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: String,
    pub plaintext: String,
    pub ciphertext: String,
}

impl Job {
    /// Build a job, failing on the first missing parameter
    ///
    /// Both paths are classified here so a malformed `gs://` reference is
    /// rejected before anything is read or sent to the KMS. Values are kept
    /// exactly as given.
    pub fn from_config(config: &Config) -> Result<Self> {
        let ciphertext = required(&config.ciphertext, "ciphertext path must be provided")?;
        let key = required(&config.key, "key name must be provided")?;
        let plaintext = required(&config.plaintext, "plaintext path must be provided")?;

        classify(&ciphertext).stage("ciphertext path")?;
        classify(&plaintext).stage("plaintext path")?;

        Ok(Self {
            key,
            plaintext,
            ciphertext,
        })
    }

    fn source(&self, direction: Direction) -> &str {
        match direction {
            Direction::Encrypt => &self.plaintext,
            Direction::Decrypt => &self.ciphertext,
        }
    }

    fn destination(&self, direction: Direction) -> &str {
        match direction {
            Direction::Encrypt => &self.ciphertext,
            Direction::Decrypt => &self.plaintext,
        }
    }
}

fn required(value: &Option<String>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(Error::Validation(message.to_string())),
    }
}

/// Read → transform → write
#[derive(Clone)]
pub struct Pipeline {
    storage: Storage,
    gateway: Arc<dyn CryptoGateway>,
}

impl Pipeline {
    pub fn new(storage: Storage, gateway: Arc<dyn CryptoGateway>) -> Self {
        Self { storage, gateway }
    }

    pub async fn run(&self, ctx: &Context, direction: Direction, job: &Job) -> Result<()> {
        let source = job.source(direction);
        let destination = job.destination(direction);
        debug!(%direction, source, destination, "starting");

        let input = self
            .storage
            .read(ctx, source)
            .await
            .stage(direction.read_stage())?;

        let output = ctx
            .run(
                direction.transform_stage(),
                direction.apply(self.gateway.as_ref(), &job.key, &input),
            )
            .await
            .stage(direction.transform_stage())?;

        self.storage
            .write(ctx, destination, &output)
            .await
            .stage(direction.write_stage())?;

        debug!(%direction, input_len = input.len(), output_len = output.len(), "finished");
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::MemoryConnector;
    use crate::traits::MockCryptoGateway;
    use tempfile::TempDir;

    const KEY: &str = "projects/p/locations/global/keyRings/r/cryptoKeys/k";

    fn job(plaintext: String, ciphertext: String) -> Job {
        Job {
            key: KEY.to_string(),
            plaintext,
            ciphertext,
        }
    }

    fn pipeline(connector: &MemoryConnector, gateway: MockCryptoGateway) -> Pipeline {
        Pipeline::new(Storage::new(Arc::new(connector.clone())), Arc::new(gateway))
    }

    fn reversing_gateway() -> MockCryptoGateway {
        let mut gateway = MockCryptoGateway::new();
        gateway
            .expect_encrypt()
            .withf(|key, _| key == KEY)
            .returning(|_, input| Ok(input.iter().rev().copied().collect()));
        gateway
            .expect_decrypt()
            .withf(|key, _| key == KEY)
            .returning(|_, input| Ok(input.iter().rev().copied().collect()));
        gateway
    }

    #[tokio::test]
    async fn test_encrypt_local_to_local() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.bin");
        let cipher = dir.path().join("cipher.bin");
        std::fs::write(&plain, [0x01, 0x02, 0x03]).unwrap();

        let pipeline = pipeline(&MemoryConnector::new(), reversing_gateway());
        let job = job(
            plain.to_string_lossy().into_owned(),
            cipher.to_string_lossy().into_owned(),
        );
        pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&cipher).unwrap(), vec![0x03, 0x02, 0x01]);
    }

    #[tokio::test]
    async fn test_decrypt_remote_to_local() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        let connector = MemoryConnector::new();
        connector.insert("bucket", "secrets/app.enc", b"terces");

        let pipeline = pipeline(&connector, reversing_gateway());
        let job = job(
            plain.to_string_lossy().into_owned(),
            "gs://bucket/secrets/app.enc".into(),
        );
        pipeline
            .run(&Context::new(), Direction::Decrypt, &job)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&plain).unwrap(), b"secret");
    }

    #[tokio::test]
    async fn test_encrypt_local_to_remote() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, b"abc").unwrap();
        let connector = MemoryConnector::new();

        let pipeline = pipeline(&connector, reversing_gateway());
        let job = job(plain.to_string_lossy().into_owned(), "gs://bucket/out.enc".into());
        pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .unwrap();

        assert_eq!(connector.get("bucket", "out.enc").unwrap(), b"cba");
    }

    #[tokio::test]
    async fn test_failing_gateway_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        let cipher = dir.path().join("cipher.bin");
        std::fs::write(&plain, b"secret").unwrap();

        let mut gateway = MockCryptoGateway::new();
        gateway
            .expect_encrypt()
            .times(1)
            .returning(|_, _| Err(Error::Crypto("PERMISSION_DENIED".into())));

        let pipeline = pipeline(&MemoryConnector::new(), gateway);
        let job = job(
            plain.to_string_lossy().into_owned(),
            cipher.to_string_lossy().into_owned(),
        );
        let err = pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Crypto);
        assert_eq!(err.stages(), vec!["encrypting plaintext"]);
        assert!(!cipher.exists());
    }

    #[tokio::test]
    async fn test_failing_gateway_leaves_existing_destination() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        let cipher = dir.path().join("cipher.bin");
        std::fs::write(&plain, b"new").unwrap();
        std::fs::write(&cipher, b"old ciphertext").unwrap();

        let mut gateway = MockCryptoGateway::new();
        gateway
            .expect_encrypt()
            .returning(|_, _| Err(Error::Crypto("key disabled".into())));

        let pipeline = pipeline(&MemoryConnector::new(), gateway);
        let job = job(
            plain.to_string_lossy().into_owned(),
            cipher.to_string_lossy().into_owned(),
        );
        assert!(pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .is_err());
        assert_eq!(std::fs::read(&cipher).unwrap(), b"old ciphertext");
    }

    #[tokio::test]
    async fn test_missing_source_skips_gateway() {
        let dir = TempDir::new().unwrap();
        let cipher = dir.path().join("cipher.bin");

        let mut gateway = MockCryptoGateway::new();
        gateway.expect_encrypt().never();

        let pipeline = pipeline(&MemoryConnector::new(), gateway);
        let job = job(
            dir.path().join("absent").to_string_lossy().into_owned(),
            cipher.to_string_lossy().into_owned(),
        );
        let err = pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("reading plaintext: "));
        assert!(!cipher.exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_labelled() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, b"abc").unwrap();
        let connector = MemoryConnector::new().failing_finalize();

        let pipeline = pipeline(&connector, reversing_gateway());
        let job = job(plain.to_string_lossy().into_owned(), "gs://bucket/out.enc".into());
        let err = pipeline
            .run(&Context::new(), Direction::Encrypt, &job)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteIo);
        assert_eq!(err.stages(), vec!["writing ciphertext"]);
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, b"abc").unwrap();
        let connector = MemoryConnector::new();

        let mut gateway = MockCryptoGateway::new();
        gateway.expect_encrypt().never();

        let ctx = Context::new();
        ctx.cancel();
        let pipeline = pipeline(&connector, gateway);
        let job = job(plain.to_string_lossy().into_owned(), "gs://bucket/out.enc".into());
        let err = pipeline.run(&ctx, Direction::Encrypt, &job).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(connector.get("bucket", "out.enc").is_none());
    }

    #[test]
    fn test_job_validation_order() {
        let mut config = Config::default();
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "ciphertext path must be provided");

        config.ciphertext = Some("gs://b/k".into());
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "key name must be provided");

        config.key = Some("   ".into());
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "key name must be provided");

        config.key = Some(KEY.into());
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "plaintext path must be provided");

        config.plaintext = Some("plain.txt".into());
        let job = Job::from_config(&config).unwrap();
        assert_eq!(job.key, KEY);
        assert_eq!(job.source(Direction::Encrypt), "plain.txt");
        assert_eq!(job.destination(Direction::Encrypt), "gs://b/k");
        assert_eq!(job.source(Direction::Decrypt), "gs://b/k");
    }

    #[test]
    fn test_job_keeps_values_verbatim() {
        let config = Config {
            key: Some(KEY.into()),
            plaintext: Some("plain.txt ".into()),
            ciphertext: Some(" gs://bucket/key".into()),
            ..Default::default()
        };
        let job = Job::from_config(&config).unwrap();

        assert_eq!(job.plaintext, "plain.txt ");
        assert_eq!(job.ciphertext, " gs://bucket/key");
        assert!(classify(&job.ciphertext).unwrap().is_local());
    }

    #[test]
    fn test_job_rejects_malformed_remote_path() {
        let mut config = Config {
            key: Some(KEY.into()),
            plaintext: Some("plain.txt".into()),
            ciphertext: Some("gs://bucket-without-object".into()),
            ..Default::default()
        };
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRemotePath);
        assert_eq!(err.stages(), vec!["ciphertext path"]);

        config.ciphertext = Some("cipher.bin".into());
        config.plaintext = Some("gs://".into());
        let err = Job::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRemotePath);
        assert_eq!(err.stages(), vec!["plaintext path"]);
    }
}
