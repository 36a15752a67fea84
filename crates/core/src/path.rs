//! Path parsing and resolution
//!
//! Handles classification of path strings into local filesystem paths and
//! remote object paths in the format: gs://bucket/key
//! Anything without the `gs://` prefix is passed through as a local path.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Scheme prefix that marks a remote object path
pub const REMOTE_SCHEME: &str = "gs://";

/// A parsed remote path pointing to an object in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Bucket name (never empty, never contains `/`)
    pub bucket: String,
    /// Object key, may contain `/`
    pub key: String,
}

impl RemotePath {
    /// Create a new RemotePath
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Get the full path as a string (gs://bucket/key)
    pub fn to_full_path(&self) -> String {
        format!("{REMOTE_SCHEME}{}/{}", self.bucket, self.key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Classified path that is either local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local filesystem path
    Local(PathBuf),
    /// Remote object path
    Remote(RemotePath),
}

impl Location {
    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }

    /// Check if this is a local path
    pub fn is_local(&self) -> bool {
        matches!(self, Location::Local(_))
    }

    /// Get the remote path if this is a remote path
    pub fn as_remote(&self) -> Option<&RemotePath> {
        match self {
            Location::Remote(p) => Some(p),
            Location::Local(_) => None,
        }
    }

    /// Get the local path if this is a local path
    pub fn as_local(&self) -> Option<&PathBuf> {
        match self {
            Location::Local(p) => Some(p),
            Location::Remote(_) => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(p) => write!(f, "{}", p.display()),
            Location::Remote(r) => write!(f, "{r}"),
        }
    }
}

/// Classify a path string as local or remote
///
/// Only strings starting with `gs://` are remote. The bucket is the segment
/// up to the next `/` and the key is everything after it. A string with the
/// prefix but no bucket, or no `/` after the bucket, is rejected rather than
/// treated as local.
pub fn classify(path: &str) -> Result<Location> {
    let Some(rest) = path.strip_prefix(REMOTE_SCHEME) else {
        return Ok(Location::Local(PathBuf::from(path)));
    };

    match rest.split_once('/') {
        Some(("", _)) => Err(Error::MalformedRemotePath(format!(
            "'{path}' has an empty bucket name. Use format: gs://bucket/key"
        ))),
        Some((bucket, key)) => Ok(Location::Remote(RemotePath::new(bucket, key))),
        None if rest.is_empty() => Err(Error::MalformedRemotePath(format!(
            "'{path}' is missing a bucket name. Use format: gs://bucket/key"
        ))),
        None => Err(Error::MalformedRemotePath(format!(
            "'{path}' is missing an object key. Use format: gs://bucket/key"
        ))),
    }
}
