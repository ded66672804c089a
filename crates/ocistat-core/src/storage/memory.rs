use super::{ByteStream, Fetcher, Storage, once, read_all};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use ocistat_schema::{Descriptor, Digest};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory content store.
///
/// Cheap to clone; clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<Digest, Bytes>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert content directly, bypassing the push path.
    pub async fn insert(&self, desc: &Descriptor, content: impl Into<Bytes>) {
        let mut map = self.inner.write().await;
        map.insert(desc.digest.clone(), content.into());
    }

    /// Number of blobs held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store holds nothing.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl Fetcher for MemoryStore {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        let map = self.inner.read().await;
        map.get(&desc.digest)
            .cloned()
            .map(once)
            .ok_or_else(|| Error::NotFound(desc.digest.clone()))
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        Ok(self.inner.read().await.contains_key(&desc.digest))
    }

    async fn push(&self, desc: &Descriptor, content: ByteStream) -> Result<()> {
        let content = read_all(desc, content).await?;
        self.insert(desc, content).await;
        Ok(())
    }
}
