//! Error types for kmstool-core
//!
//! Provides a unified error type that carries a machine-readable kind,
//! a chain of stage labels, and an exit code for the CLI.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for kmstool-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across stage wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRemotePath,
    NotFound,
    Io,
    RemoteClient,
    RemoteIo,
    Crypto,
    Validation,
    Config,
    Cancelled,
    DeadlineExceeded,
}

/// Error types for kmstool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Path carries the remote scheme but cannot be split into bucket and key
    #[error("Malformed remote path: {0}")]
    MalformedRemotePath(String),

    /// Local file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Local filesystem error other than not-found
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unable to construct or authenticate a remote client
    #[error("Remote client error: {0}")]
    RemoteClient(String),

    /// Remote open, read, write or finalize failure
    #[error("Remote I/O error on {path}: {message}")]
    RemoteIo { path: String, message: String },

    /// Key management service refused or failed the request
    #[error("KMS error: {0}")]
    Crypto(String),

    /// A required invocation parameter is missing
    #[error("{0}")]
    Validation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The execution context was cancelled while a step was in flight
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The execution context deadline passed while a step was in flight
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// An error annotated with the stage that produced it
    #[error("{stage}: {source}")]
    Context {
        stage: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for a remote I/O error on `path`
    pub fn remote_io(path: impl ToString, message: impl Into<String>) -> Self {
        Error::RemoteIo {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Wrap this error with a stage label
    pub fn context(self, stage: impl Into<String>) -> Self {
        Error::Context {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedRemotePath(_) => ErrorKind::MalformedRemotePath,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io { .. } => ErrorKind::Io,
            Error::RemoteClient(_) => ErrorKind::RemoteClient,
            Error::RemoteIo { .. } => ErrorKind::RemoteIo,
            Error::Crypto(_) => ErrorKind::Crypto,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Config(_) => ErrorKind::Config,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            Error::Context { source, .. } => source.kind(),
        }
    }

    /// Stage labels from the outermost to the innermost
    pub fn stages(&self) -> Vec<&str> {
        let mut stages = Vec::new();
        let mut current = self;
        while let Error::Context { stage, source } = current {
            stages.push(stage.as_str());
            current = source;
        }
        stages
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::MalformedRemotePath | ErrorKind::Validation | ErrorKind::Config => 2, // UsageError
            ErrorKind::RemoteClient | ErrorKind::RemoteIo | ErrorKind::DeadlineExceeded => 3, // NetworkError
            ErrorKind::Crypto => 4,      // CryptoError
            ErrorKind::NotFound => 5,    // NotFound
            ErrorKind::Cancelled => 130, // Interrupted
            ErrorKind::Io => 1,          // GeneralError
        }
    }
}

/// Attach stage labels to results
pub trait ResultExt<T> {
    /// Wrap the error, if any, with `stage`
    fn stage(self, stage: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn stage(self, stage: &str) -> Result<T> {
        self.map_err(|e| e.context(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::MalformedRemotePath("gs://".into()).exit_code(), 2);
        assert_eq!(Error::Validation("test".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::RemoteClient("test".into()).exit_code(), 3);
        assert_eq!(Error::remote_io("gs://b/k", "test").exit_code(), 3);
        assert_eq!(Error::DeadlineExceeded("test".into()).exit_code(), 3);
        assert_eq!(Error::Crypto("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("missing".into()).exit_code(), 5);
        assert_eq!(Error::Cancelled("test".into()).exit_code(), 130);

        let io = Error::Io {
            path: "denied".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn test_context_keeps_inner_kind() {
        let err = Error::Crypto("permission denied".into())
            .context("encrypting plaintext")
            .context("encrypt");
        assert_eq!(err.kind(), ErrorKind::Crypto);
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.stages(), vec!["encrypt", "encrypting plaintext"]);
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("/tmp/plain.txt".into()).context("reading plaintext");
        assert_eq!(
            err.to_string(),
            "reading plaintext: File not found: /tmp/plain.txt"
        );

        let err = Error::remote_io("gs://bucket/key", "object does not exist");
        assert_eq!(
            err.to_string(),
            "Remote I/O error on gs://bucket/key: object does not exist"
        );
    }

    #[test]
    fn test_result_ext_stage() {
        let ok: Result<u8> = Ok(1);
        assert_eq!(ok.stage("unused").unwrap(), 1);

        let failed: Result<u8> = Err(Error::Validation("key name must be provided".into()));
        let err = failed.stage("validating parameters").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.stages(), vec!["validating parameters"]);
    }
}
