//! Child processes for the gcloud-backed adapters

use std::process::{Output, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Spawn `program` with every stdio stream piped
///
/// The child is killed if its handle is dropped before it exits.
pub(crate) fn spawn(program: &str, args: &[&str]) -> std::io::Result<Child> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Write `input` to the child's stdin while collecting its output
///
/// Returns the output and the result of feeding stdin separately; a child
/// that exits early makes the write fail, and its status is the better
/// error to report.
pub(crate) async fn feed_and_wait(
    mut child: Child,
    input: &[u8],
) -> std::io::Result<(Output, std::io::Result<()>)> {
    let stdin = child.stdin.take();
    // Feed stdin while draining stdout so large payloads cannot deadlock
    let feed = async move {
        match stdin {
            Some(mut stdin) => {
                let result = stdin.write_all(input).await;
                drop(stdin);
                result
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdin is not piped",
            )),
        }
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    Ok((output?, fed))
}

/// Trimmed stderr of a finished child
pub(crate) fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
