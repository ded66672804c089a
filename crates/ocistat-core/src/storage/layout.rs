//! OCI image-layout directory store.
//!
//! Layout: `blobs/<algorithm>/<hex>` - every blob addressed by its digest.
//! Layout: `oci-layout` - version marker written on creation.

use super::{ByteStream, Fetcher, Storage};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use ocistat_schema::Descriptor;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

const LAYOUT_MARKER: &str = "oci-layout";
const LAYOUT_VERSION: &str = r#"{"imageLayoutVersion":"1.0.0"}"#;

/// Content store backed by an OCI image-layout directory.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    root: PathBuf,
}

impl LayoutStore {
    /// Open (creating if needed) a layout rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or marker cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("blobs")).await?;
        let marker = root.join(LAYOUT_MARKER);
        if fs::metadata(&marker).await.is_err() {
            fs::write(&marker, LAYOUT_VERSION).await?;
        }
        Ok(Self { root })
    }

    /// Root directory of the layout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a blob lives at.
    pub fn blob_path(&self, desc: &Descriptor) -> PathBuf {
        self.root
            .join("blobs")
            .join(desc.digest.algorithm())
            .join(desc.digest.encoded())
    }
}

#[async_trait]
impl Fetcher for LayoutStore {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        let file = File::open(self.blob_path(desc)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound(desc.digest.clone())
            } else {
                Error::transfer(&desc.digest, e)
            }
        })?;
        Ok(ReaderStream::new(file).boxed())
    }
}

#[async_trait]
impl Storage for LayoutStore {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        match fs::metadata(self.blob_path(desc)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::transfer(&desc.digest, e)),
        }
    }

    async fn push(&self, desc: &Descriptor, content: ByteStream) -> Result<()> {
        let dest = self.blob_path(desc);
        let dir = dest
            .parent()
            .map_or_else(|| self.root.join("blobs"), Path::to_path_buf);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::transfer(&desc.digest, e))?;

        // Write beside the final path so the rename stays on one filesystem.
        let tmp = dir.join(format!(".{}.partial", desc.digest.encoded()));
        let written = match write_file(&tmp, content).await {
            Ok(()) => fs::rename(&tmp, &dest).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::transfer(&desc.digest, e));
        }
        Ok(())
    }
}

async fn write_file(path: &Path, mut content: ByteStream) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    while let Some(chunk) = content.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await
}
