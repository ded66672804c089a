//! Single-blob push

use crate::Settings;
use anyhow::{Context, Result};
use ocistat_core::handler::{BlobPushHandler, Tracking};
use ocistat_core::storage::{LayoutStore, Storage, once};
use ocistat_schema::Descriptor;
use std::path::Path;
use std::sync::Arc;

/// Push `file` into the layout at `layout` as one blob.
pub async fn push_blob(
    layout: &Path,
    file: &Path,
    media_type: &str,
    settings: Settings,
) -> Result<()> {
    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let mut desc = Descriptor::new(media_type, &content);
    if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
        desc = desc.with_title(name);
    }

    let store = LayoutStore::open(layout)
        .await
        .with_context(|| format!("failed to open layout {}", layout.display()))?;
    let store: Arc<dyn Storage> = Arc::new(store);

    let console = settings.console();
    let mut handler = BlobPushHandler::new(console.clone(), desc.clone());

    if store.exists(&desc).await? {
        handler.on_blob_exists()?;
        return Ok(());
    }

    let target = if console.is_interactive() {
        handler
            .start_tracking(Arc::clone(&store))
            .context("failed to start progress display")?
    } else {
        store
    };

    handler.on_blob_uploading()?;
    let pushed = target.push(&desc, once(content.into())).await;
    let reported = pushed.and_then(|()| handler.on_blob_uploaded());
    handler
        .stop_tracking()
        .context("failed to stop progress display")?;
    reported.with_context(|| format!("failed to push {}", desc.digest))?;

    tracing::debug!(digest = %desc.digest, size = desc.size, "blob pushed");
    Ok(())
}
