//! Copy, backup and restore between layouts

use super::{cancel_on_interrupt, resolve_root};
use crate::Settings;
use anyhow::{Context, Result};
use ocistat_core::handler::{BackupHandler, CopyHandler, RestoreHandler, TransferHandler, Tracking};
use ocistat_core::storage::{Fetcher, LayoutStore, Storage};
use ocistat_core::{Console, copy_graph};
use std::path::Path;
use std::sync::Arc;

/// Which status verbs a copy prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `Copying` / `Copied`
    Copy,
    /// `Downloading` / `Downloaded`
    Backup,
    /// `Uploading` / `Restored`
    Restore,
}

/// Copy the graph rooted at `digest` from layout `from` into layout `to`.
pub async fn copy(
    from: &Path,
    to: &Path,
    digest: &str,
    mode: Mode,
    settings: Settings,
) -> Result<()> {
    let src = LayoutStore::open(from)
        .await
        .with_context(|| format!("failed to open layout {}", from.display()))?;
    let dst = LayoutStore::open(to)
        .await
        .with_context(|| format!("failed to open layout {}", to.display()))?;
    let root = resolve_root(&src, digest).await?;

    let console = settings.console();
    let src: Arc<dyn Fetcher> = Arc::new(src);
    let dst: Arc<dyn Storage> = Arc::new(dst);
    match mode {
        Mode::Copy => {
            let handler = TransferHandler::new(console.clone(), Arc::clone(&dst));
            run(handler, &console, &src, dst, &root, settings).await
        }
        Mode::Backup => {
            let handler = BackupHandler::new(console.clone(), Arc::clone(&src));
            run(handler, &console, &src, dst, &root, settings).await
        }
        Mode::Restore => {
            let handler = RestoreHandler::new(console.clone(), Arc::clone(&src));
            run(handler, &console, &src, dst, &root, settings).await
        }
    }
}

async fn run<H: CopyHandler + Tracking>(
    mut handler: H,
    console: &Console,
    src: &Arc<dyn Fetcher>,
    dst: Arc<dyn Storage>,
    root: &ocistat_schema::Descriptor,
    settings: Settings,
) -> Result<()> {
    let target = if console.is_interactive() {
        handler
            .start_tracking(dst)
            .context("failed to start progress display")?
    } else {
        dst
    };

    let cancel = cancel_on_interrupt();
    let result = copy_graph(
        &**src,
        &*target,
        root,
        &handler,
        &settings.copy_options(),
        &cancel,
    )
    .await;
    handler
        .stop_tracking()
        .context("failed to stop progress display")?;

    result.with_context(|| format!("failed to copy {}", root.digest))
}
