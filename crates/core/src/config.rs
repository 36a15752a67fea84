//! Configuration management
//!
//! Settings come from a TOML or YAML file (`~/.kmstool.toml` or
//! `./.kmstool.toml`, `.yaml`/`.yml` also accepted, or an explicit path),
//! overlaid with values from the environment and the command line. The result is one `Config` built at startup and handed to
//! the pipeline, storage connector and KMS gateway.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// File name looked up in the home and current directories
pub const CONFIG_FILE_NAME: &str = ".kmstool.toml";

/// Names tried in each directory, in order
const CONFIG_FILE_NAMES: [&str; 3] = [CONFIG_FILE_NAME, ".kmstool.yaml", ".kmstool.yml"];

/// Cloud Storage XML API endpoint
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Region reported to the signer; Cloud Storage accepts `auto`
const DEFAULT_STORAGE_REGION: &str = "auto";

const DEFAULT_GCLOUD: &str = "gcloud";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fully qualified KMS key name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Plaintext path, local or gs://bucket/object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,

    /// Ciphertext path, local or gs://bucket/object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,

    /// Give up on the whole invocation after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Object storage connection settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key management settings
    #[serde(default)]
    pub kms: KmsConfig,

    /// File this configuration was loaded from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Object storage connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// XML API endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// HMAC access key; the SDK default credential chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// HMAC secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// gcloud executable used for gs:// objects when no HMAC pair is set
    #[serde(default = "default_gcloud")]
    pub gcloud: String,
}

fn default_endpoint() -> String {
    DEFAULT_STORAGE_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_STORAGE_REGION.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            access_key: None,
            secret_key: None,
            gcloud: default_gcloud(),
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("gcloud", &self.gcloud)
            .finish()
    }
}

impl StorageConfig {
    /// True when both HMAC keys are set
    pub fn has_hmac(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }

    /// True when the endpoint is the public Cloud Storage XML API
    pub fn is_default_endpoint(&self) -> bool {
        self.endpoint.trim_end_matches('/') == DEFAULT_STORAGE_ENDPOINT
    }

    /// Check the endpoint URL and that HMAC keys come in pairs
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            Error::Config(format!("invalid storage endpoint '{}': {e}", self.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "storage endpoint '{}' must use http or https",
                self.endpoint
            )));
        }

        match (&self.access_key, &self.secret_key) {
            (Some(_), None) | (None, Some(_)) => Err(Error::Config(
                "storage access_key and secret_key must be set together".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Which key management service performs encrypt/decrypt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KmsProvider {
    /// Google Cloud KMS
    #[default]
    Gcp,
    /// AWS KMS
    Aws,
}

impl FromStr for KmsProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcp" => Ok(Self::Gcp),
            "aws" => Ok(Self::Aws),
            other => Err(format!("unknown KMS provider '{other}', expected gcp or aws")),
        }
    }
}

impl std::fmt::Display for KmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gcp => write!(f, "gcp"),
            Self::Aws => write!(f, "aws"),
        }
    }
}

/// Key management settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KmsConfig {
    #[serde(default)]
    pub provider: KmsProvider,

    /// gcloud executable used for Cloud KMS calls
    #[serde(default = "default_gcloud")]
    pub gcloud: String,
}

fn default_gcloud() -> String {
    DEFAULT_GCLOUD.to_string()
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            provider: KmsProvider::default(),
            gcloud: default_gcloud(),
        }
    }
}

/// Values from flags or the environment; `None` leaves the file value alone
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub key: Option<String>,
    pub plaintext: Option<String>,
    pub ciphertext: Option<String>,
    pub verbose: bool,
    pub timeout_secs: Option<u64>,
    pub kms_provider: Option<KmsProvider>,
}

impl Config {
    /// Overlay `overrides` on top of this configuration
    pub fn merge(mut self, overrides: Overrides) -> Self {
        if overrides.key.is_some() {
            self.key = overrides.key;
        }
        if overrides.plaintext.is_some() {
            self.plaintext = overrides.plaintext;
        }
        if overrides.ciphertext.is_some() {
            self.ciphertext = overrides.ciphertext;
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
        if let Some(provider) = overrides.kms_provider {
            self.kms.provider = provider;
        }
        self.verbose |= overrides.verbose;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()
    }
}

/// Configuration manager handles locating and loading the config file
#[derive(Debug)]
pub struct ConfigManager {
    candidates: Vec<PathBuf>,
    required: bool,
}

impl ConfigManager {
    /// Look in the home directory, then the current directory
    pub fn discover() -> Self {
        let dirs = dirs::home_dir().into_iter().chain([PathBuf::from(".")]);
        let candidates = dirs
            .flat_map(|dir| CONFIG_FILE_NAMES.map(|name| dir.join(name)))
            .collect();
        Self {
            candidates,
            required: false,
        }
    }

    /// Use exactly `path`, which must exist
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
            required: true,
        }
    }

    /// Paths that will be tried, in order
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Load the first existing candidate, or defaults when none exists
    pub fn load(&self) -> Result<Config> {
        for path in &self.candidates {
            if path.is_file() {
                return load_file(path);
            }
        }

        if self.required {
            let path = self.candidates.first().map(|p| p.display().to_string());
            return Err(Error::Config(format!(
                "configuration file not found: {}",
                path.unwrap_or_default()
            )));
        }

        debug!(candidates = ?self.candidates, "no configuration file found, using defaults");
        Ok(Config::default())
    }
}

fn load_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => {
            serde_yaml::from_str::<Config>(&content).map_err(|e| e.to_string())
        }
        _ => toml::from_str::<Config>(&content).map_err(|e| e.to_string()),
    };
    let mut config =
        parsed.map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}
