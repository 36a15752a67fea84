//! In-memory object store used by unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{ObjectReader, ObjectStore, ObjectWriter, StoreConnector};

type Objects = Arc<Mutex<HashMap<(String, String), Vec<u8>>>>;

/// Shared state behind every client a [`MemoryConnector`] hands out
#[derive(Debug, Default, Clone)]
pub struct MemoryConnector {
    objects: Objects,
    connects: Arc<AtomicUsize>,
    open_readers: Arc<AtomicUsize>,
    fail_connect: bool,
    fail_finalize: bool,
    fail_read: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Readers opened and not yet closed or dropped
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn ObjectStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(Error::RemoteClient("no credentials".into()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryConnector {
    async fn open_reader(&self, path: &RemotePath) -> Result<Box<dyn ObjectReader>> {
        let data = self
            .get(&path.bucket, &path.key)
            .ok_or_else(|| Error::remote_io(path, "object does not exist"))?;
        self.open_readers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryReader {
            path: path.to_string(),
            data: Some(data),
            fail: self.fail_read,
            open_readers: Arc::clone(&self.open_readers),
        }))
    }

    async fn open_writer(&self, path: &RemotePath) -> Result<Box<dyn ObjectWriter>> {
        Ok(Box::new(MemoryWriter {
            path: path.clone(),
            buffer: Vec::new(),
            objects: Arc::clone(&self.objects),
            fail_finalize: self.fail_finalize,
        }))
    }
}

struct MemoryReader {
    path: String,
    data: Option<Vec<u8>>,
    fail: bool,
    open_readers: Arc<AtomicUsize>,
}

#[async_trait]
impl ObjectReader for MemoryReader {
    async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::remote_io(&self.path, "connection reset"));
        }
        self.data
            .take()
            .ok_or_else(|| Error::remote_io(&self.path, "reader already consumed"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.open_readers.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryWriter {
    path: RemotePath,
    buffer: Vec<u8>,
    objects: Objects,
    fail_finalize: bool,
}

#[async_trait]
impl ObjectWriter for MemoryWriter {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<()> {
        if self.fail_finalize {
            return Err(Error::remote_io(&self.path, "precondition failed on commit"));
        }
        let this = *self;
        this.objects
            .lock()
            .unwrap()
            .insert((this.path.bucket, this.path.key), this.buffer);
        Ok(())
    }
}
