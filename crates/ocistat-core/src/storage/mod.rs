//! Storage capabilities consumed by the reporting layer.
//!
//! The copy engine moves content between two [`Storage`] targets. This crate
//! only reads from them to resolve successors, and wraps the destination to
//! observe pushed bytes.

mod layout;
mod memory;

pub use layout::LayoutStore;
pub use memory::MemoryStore;

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::BoxStream;
use ocistat_schema::Descriptor;
use std::sync::Arc;

/// Streamed content of one blob.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Something content can be read from.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Open the content described by `desc`.
    ///
    /// Fails with [`Error::NotFound`] when the content is absent.
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream>;
}

/// A storage endpoint the copy engine reads from or writes to.
#[async_trait]
pub trait Storage: Fetcher {
    /// Whether the content described by `desc` is present.
    async fn exists(&self, desc: &Descriptor) -> Result<bool>;

    /// Store `content` under `desc`.
    async fn push(&self, desc: &Descriptor, content: ByteStream) -> Result<()>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        (**self).fetch(desc).await
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        (**self).exists(desc).await
    }

    async fn push(&self, desc: &Descriptor, content: ByteStream) -> Result<()> {
        (**self).push(desc, content).await
    }
}

/// Drain a stream into memory, tagging I/O failures with the digest.
pub async fn read_all(desc: &Descriptor, mut stream: ByteStream) -> Result<Bytes> {
    let capacity = usize::try_from(desc.size).unwrap_or(0);
    let mut buf = BytesMut::with_capacity(capacity);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::transfer(&desc.digest, e))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Fetch and fully read the content described by `desc`.
pub async fn fetch_all<F: Fetcher + ?Sized>(fetcher: &F, desc: &Descriptor) -> Result<Bytes> {
    let stream = fetcher.fetch(desc).await?;
    read_all(desc, stream).await
}

/// A stream that yields `content` in one chunk.
pub fn once(content: Bytes) -> ByteStream {
    futures::stream::once(async move { Ok(content) }).boxed()
}
