//! Storage accessor
//!
//! Reads and writes whole byte payloads at a path string, dispatching to the
//! local filesystem or to the object store depending on how the path
//! classifies. Remote clients are built fresh for every call.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::path::{Location, RemotePath, classify};
use crate::traits::StoreConnector;

/// Permission bits for files created by [`Storage::write`]
pub const LOCAL_FILE_MODE: u32 = 0o644;

/// Uniform read/write over local files and remote objects
#[derive(Clone)]
pub struct Storage {
    connector: Arc<dyn StoreConnector>,
}

impl Storage {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// Read the entire content at `path`
    pub async fn read(&self, ctx: &Context, path: &str) -> Result<Vec<u8>> {
        let data = match classify(path)? {
            Location::Local(local) => ctx.run("reading file", read_local(&local)).await?,
            Location::Remote(remote) => self.read_remote(ctx, &remote).await?,
        };
        debug!(path, size = %human(data.len()), "read payload");
        Ok(data)
    }

    /// Replace the content at `path` with `data`
    pub async fn write(&self, ctx: &Context, path: &str, data: &[u8]) -> Result<()> {
        match classify(path)? {
            Location::Local(local) => ctx.run("writing file", write_local(&local, data)).await?,
            Location::Remote(remote) => self.write_remote(ctx, &remote, data).await?,
        }
        debug!(path, size = %human(data.len()), "wrote payload");
        Ok(())
    }

    async fn read_remote(&self, ctx: &Context, path: &RemotePath) -> Result<Vec<u8>> {
        let store = ctx
            .run("connecting to object store", self.connector.connect())
            .await?;
        let mut reader = ctx
            .run("opening object", store.open_reader(path))
            .await?;

        let result = ctx.run("reading object", reader.read_to_end()).await;

        // Close regardless of how the read ended; a read error wins.
        if let Err(e) = reader.close().await {
            warn!(%path, error = %e, "failed to close object reader");
        }
        result
    }

    async fn write_remote(&self, ctx: &Context, path: &RemotePath, data: &[u8]) -> Result<()> {
        let store = ctx
            .run("connecting to object store", self.connector.connect())
            .await?;
        let mut writer = ctx
            .run("opening object writer", store.open_writer(path))
            .await?;

        ctx.run("writing object", writer.write(data)).await?;
        ctx.run("finalizing object", writer.finalize()).await
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            io_error(path, e)
        }
    })
}

async fn write_local(path: &Path, data: &[u8]) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(LOCAL_FILE_MODE);

    let mut file = options.open(path).await.map_err(|e| io_error(path, e))?;
    file.write_all(data).await.map_err(|e| io_error(path, e))?;
    file.flush().await.map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn human(len: usize) -> String {
    humansize::format_size(len as u64, humansize::BINARY)
}
