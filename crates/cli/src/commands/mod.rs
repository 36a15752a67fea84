//! CLI command definitions and execution
//!
//! `encrypt` and `decrypt` share one flow: load and merge configuration,
//! install logging, then run the pipeline in the requested direction.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use kmstool_cloud::kms;
use kmstool_core::{
    Config, ConfigManager, Context, Direction, Job, KmsProvider, Overrides, Pipeline, Result,
    Storage,
};

use crate::exit_code::ExitCode;
use crate::{logging, output};

mod completions;
mod decrypt;
mod encrypt;

/// kmstool - encrypt and decrypt files with a cloud KMS
///
/// Paths are local files or gs://bucket/object references. Every option may
/// also come from the environment (KMSTOOL_*) or from ~/.kmstool.toml.
#[derive(Parser, Debug)]
#[command(name = "kmstool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Fully qualified KMS key name
    #[arg(short = 'k', long, global = true, env = "KMSTOOL_KEY")]
    pub key: Option<String>,

    /// Ciphertext path (local or gs://bucket/object)
    #[arg(short = 's', long, global = true, env = "KMSTOOL_CIPHERTEXT")]
    pub ciphertext: Option<String>,

    /// Plaintext path (local or gs://bucket/object)
    #[arg(short = 'P', long, global = true, env = "KMSTOOL_PLAINTEXT")]
    pub plaintext: Option<String>,

    /// Human-readable debug logging instead of JSON
    #[arg(short, long, global = true, env = "KMSTOOL_VERBOSE")]
    pub verbose: bool,

    /// Configuration file (default: ~/.kmstool.toml, then ./.kmstool.toml)
    #[arg(short, long, global = true, env = "KMSTOOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Key management service: gcp or aws
    #[arg(long, global = true, env = "KMSTOOL_KMS_PROVIDER")]
    pub kms_provider: Option<KmsProvider>,

    /// Abort the invocation after this many seconds
    #[arg(long, global = true, env = "KMSTOOL_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl GlobalArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            key: self.key.clone(),
            plaintext: self.plaintext.clone(),
            ciphertext: self.ciphertext.clone(),
            verbose: self.verbose,
            timeout_secs: self.timeout,
            kms_provider: self.kms_provider,
        }
    }

    /// Configuration file merged with flags and environment
    pub fn load_config(&self) -> Result<Config> {
        let manager = match &self.config {
            Some(path) => ConfigManager::with_path(path),
            None => ConfigManager::discover(),
        };
        let config = manager.load()?.merge(self.overrides());
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt the plaintext path into the ciphertext path
    Encrypt,

    /// Decrypt the ciphertext path into the plaintext path
    Decrypt,

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli, ctx: Context) -> ExitCode {
    match cli.command {
        Commands::Encrypt => encrypt::execute(&cli.global, ctx).await,
        Commands::Decrypt => decrypt::execute(&cli.global, ctx).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Run the pipeline in `direction`, reporting any failure on stderr
async fn run_transform(direction: Direction, global: &GlobalArgs, ctx: Context) -> ExitCode {
    match transform(direction, global, ctx).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            output::error(&e);
            ExitCode::from_error(&e)
        }
    }
}

async fn transform(direction: Direction, global: &GlobalArgs, ctx: Context) -> Result<()> {
    let config = global.load_config()?;
    logging::init(config.verbose);
    if let Some(source) = &config.source {
        debug!(path = %source.display(), "loaded configuration");
    }

    let ctx = match config.timeout_secs {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx,
    };

    let job = Job::from_config(&config)?;
    let storage = Storage::new(kmstool_cloud::connector(&config.storage));
    let pipeline = Pipeline::new(storage, kms::gateway(&config.kms));

    info!(
        %direction,
        key = %job.key,
        plaintext = %job.plaintext,
        ciphertext = %job.ciphertext,
        provider = %config.kms.provider,
        "starting"
    );
    pipeline.run(&ctx, direction, &job).await?;
    info!(%direction, "done");
    Ok(())
}
