//! Execution context
//!
//! A `Context` travels with every read, write and KMS call of one invocation.
//! It carries a cancellation token and an optional deadline; any step run
//! through [`Context::run`] fails as soon as either fires.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancellation and deadline scope for one invocation
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a context with no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a context sharing this cancellation token that expires after `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Cancel every step running under this context and its clones
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `operation`, failing early on cancellation or deadline
    ///
    /// The future is dropped when the context fires, which releases any
    /// handle it owns.
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                Err(Error::Cancelled(format!("{operation} was cancelled")))
            }
            _ = deadline => {
                Err(Error::DeadlineExceeded(format!("{operation} did not finish in time")))
            }
            result = future => result,
        }
    }
}
