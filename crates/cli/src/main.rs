//! kmstool - encrypt and decrypt files with a cloud KMS
//!
//! Reads a payload from a local file or a gs:// object, sends it through the
//! key management service and writes the result to another local file or
//! gs:// object.

use clap::Parser;
use tracing::warn;

use kmstool::commands::{self, Cli};
use kmstool_core::Context;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let ctx = Context::new();

    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let exit_code = commands::execute(cli, ctx).await;
    std::process::exit(exit_code.as_i32());
}
