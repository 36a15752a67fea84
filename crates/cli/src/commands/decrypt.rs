//! decrypt command
//!
//! Ciphertext path in, plaintext path out.

use kmstool_core::{Context, Direction};

use super::{GlobalArgs, run_transform};
use crate::exit_code::ExitCode;

pub async fn execute(global: &GlobalArgs, ctx: Context) -> ExitCode {
    run_transform(Direction::Decrypt, global, ctx).await
}
