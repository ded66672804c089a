//! Reference copy driver.
//!
//! Walks the graph below a root descriptor and copies it from one target to
//! another in post-order, calling the handler hooks along the way. Each
//! distinct digest is visited once per run, however many parents it has.

use crate::handler::CopyHandler;
use crate::storage::{Fetcher, Storage};
use crate::successors::scoped_successors;
use crate::{Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use ocistat_schema::{Descriptor, Digest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OnceCell, Semaphore};
use tokio_util::sync::CancellationToken;

/// Default number of concurrent transfers.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Copy tuning.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Maximum number of blobs transferred at once. Zero is treated as one.
    pub concurrency: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Copy `root` and everything it refers to from `src` to `dst`.
///
/// For every node: if `dst` already has it, [`CopyHandler::on_copy_skipped`]
/// is called and its successors are left alone. Otherwise its successors are
/// copied first, then the node itself between
/// [`CopyHandler::pre_copy`] and [`CopyHandler::post_copy`].
///
/// # Errors
///
/// Returns the first error from storage, successor resolution or the
/// handler. Nothing is retried.
pub async fn copy_graph<S, D, H>(
    src: &S,
    dst: &D,
    root: &Descriptor,
    handler: &H,
    options: &CopyOptions,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: Fetcher + ?Sized,
    D: Storage + ?Sized,
    H: CopyHandler + ?Sized,
{
    let copier = Copier {
        src,
        dst,
        handler,
        cancel,
        permits: Semaphore::new(options.concurrency.max(1)),
        visited: Mutex::new(HashMap::new()),
    };
    tracing::debug!(root = %root.digest, concurrency = options.concurrency, "copy started");
    copier.visit(root).await?;
    tracing::debug!(
        root = %root.digest,
        nodes = copier.visited.lock().unwrap_or_else(PoisonError::into_inner).len(),
        "copy finished"
    );
    Ok(())
}

struct Copier<'a, S: ?Sized, D: ?Sized, H: ?Sized> {
    src: &'a S,
    dst: &'a D,
    handler: &'a H,
    cancel: &'a CancellationToken,
    permits: Semaphore,
    visited: Mutex<HashMap<Digest, Arc<OnceCell<()>>>>,
}

impl<S, D, H> Copier<'_, S, D, H>
where
    S: Fetcher + ?Sized,
    D: Storage + ?Sized,
    H: CopyHandler + ?Sized,
{
    fn visit<'b>(&'b self, desc: &'b Descriptor) -> BoxFuture<'b, Result<()>> {
        async move {
            let cell = Arc::clone(
                self.visited
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(desc.digest.clone())
                    .or_default(),
            );
            cell.get_or_try_init(|| self.copy_node(desc)).await?;
            Ok(())
        }
        .boxed()
    }

    async fn copy_node(&self, desc: &Descriptor) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.dst.exists(desc).await? {
            tracing::trace!(digest = %desc.digest, "already at destination");
            return self.handler.on_copy_skipped(self.cancel, desc).await;
        }

        let successors = scoped_successors(self.cancel, self.src, desc).await?;
        try_join_all(successors.iter().map(|s| self.visit(s))).await?;

        self.handler.pre_copy(self.cancel, desc).await?;
        {
            let _permit = self.permits.acquire().await.map_err(|_| Error::Cancelled)?;
            let content = self.src.fetch(desc).await?;
            self.dst.push(desc, content).await?;
        }
        tracing::trace!(digest = %desc.digest, size = desc.size, "copied");
        self.handler.post_copy(self.cancel, desc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BackupHandler, TransferHandler};
    use crate::prompt::{Console, Verb, status_line};
    use crate::storage::{MemoryStore, fetch_all};
    use crate::testutil::{Fixture, SharedBuf};
    use ocistat_schema::{ImageIndex, media_type};
    use rand::Rng;
    use rand::seq::SliceRandom;
    use std::collections::BTreeMap;
    use std::io::{self, Write};

    fn count(lines: &[String], desc: &Descriptor) -> usize {
        let short = desc.digest.short();
        lines.iter().filter(|l| l.contains(short)).count()
    }

    #[tokio::test]
    async fn scenario_layer_present_at_destination() {
        let fixture = Fixture::new().await;
        let dst = MemoryStore::new();
        dst.insert(&fixture.layer1, &b"hello"[..]).await;
        let buf = SharedBuf::default();
        let handler =
            BackupHandler::new(Console::from_writer(buf.clone()), Arc::new(fixture.store.clone()));

        copy_graph(
            &fixture.store,
            &dst,
            &fixture.manifest,
            &handler,
            &CopyOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let lines = buf.lines();
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&status_line(Verb::Exists, &fixture.layer1)));
        assert!(lines.contains(&status_line(Verb::Downloaded, &fixture.layer2)));
        assert!(lines.contains(&status_line(Verb::Downloaded, &fixture.config)));
        assert_eq!(lines.last(), Some(&status_line(Verb::Downloaded, &fixture.manifest)));
        assert_eq!(fetch_all(&dst, &fixture.layer2).await.unwrap(), "world");
        assert_eq!(dst.len().await, 4);
    }

    #[tokio::test]
    async fn present_root_is_only_skipped() {
        let fixture = Fixture::new().await;
        let buf = SharedBuf::default();
        let handler = TransferHandler::new(
            Console::from_writer(buf.clone()),
            Arc::new(fixture.store.clone()),
        );

        copy_graph(
            &fixture.store,
            &fixture.store,
            &fixture.index,
            &handler,
            &CopyOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(buf.lines(), vec![status_line(Verb::Exists, &fixture.index)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_report_each_digest_once() {
        let fixture = Fixture::new().await;
        let doc = ImageIndex {
            schema_version: 2,
            media_type: Some(media_type::OCI_INDEX.to_string()),
            manifests: vec![fixture.sibling.clone(), fixture.manifest.clone()],
            subject: None,
            annotations: BTreeMap::new(),
        };
        let bytes = serde_json::to_vec(&doc).unwrap();
        let root = Descriptor::new(media_type::OCI_INDEX, &bytes);
        fixture.store.insert(&root, bytes).await;

        let nodes = [
            root.clone(),
            fixture.manifest.clone(),
            fixture.sibling.clone(),
            fixture.config.clone(),
            fixture.layer1.clone(),
            fixture.layer2.clone(),
        ];
        let leaves = [fixture.config.clone(), fixture.layer1.clone(), fixture.layer2.clone()];

        for _ in 0..8 {
            let buf = SharedBuf::default();
            let handler = Arc::new(TransferHandler::new(
                Console::from_writer(buf.clone()),
                Arc::new(fixture.store.clone()),
            ));

            let mut tasks = Vec::new();
            for _ in 0..8 {
                let dst = MemoryStore::new();
                let preloaded: Vec<Descriptor> = {
                    let mut rng = rand::rng();
                    let mut picked: Vec<_> =
                        leaves.iter().filter(|_| rng.random_bool(0.5)).cloned().collect();
                    picked.shuffle(&mut rng);
                    picked
                };
                for leaf in &preloaded {
                    let content = fetch_all(&fixture.store, leaf).await.unwrap();
                    dst.insert(leaf, content).await;
                }

                let src = fixture.store.clone();
                let handler = Arc::clone(&handler);
                let root = root.clone();
                let concurrency = rand::rng().random_range(1..=4);
                tasks.push(tokio::spawn(async move {
                    copy_graph(
                        &src,
                        &dst,
                        &root,
                        &*handler,
                        &CopyOptions { concurrency },
                        &CancellationToken::new(),
                    )
                    .await
                }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            let lines = buf.lines();
            for node in &nodes {
                assert_eq!(count(&lines, node), 1, "{} in {lines:#?}", node.digest);
            }
            assert_eq!(lines.len(), nodes.len());
        }
    }

    #[tokio::test]
    async fn missing_root_fails() {
        let fixture = Fixture::new().await;
        let ghost = Descriptor::new(media_type::OCI_LAYER, b"ghost");
        let handler =
            BackupHandler::new(Console::from_writer(Vec::new()), Arc::new(fixture.store.clone()));

        let err = copy_graph(
            &fixture.store,
            &MemoryStore::new(),
            &ghost,
            &handler,
            &CopyOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(d) if d == ghost.digest));
    }

    #[tokio::test]
    async fn broken_console_aborts_copy() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let fixture = Fixture::new().await;
        let handler =
            BackupHandler::new(Console::from_writer(Broken), Arc::new(fixture.store.clone()));
        let err = copy_graph(
            &fixture.store,
            &MemoryStore::new(),
            &fixture.manifest,
            &handler,
            &CopyOptions { concurrency: 1 },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Report(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn cancelled_copy_transfers_nothing() {
        let fixture = Fixture::new().await;
        let dst = MemoryStore::new();
        let handler =
            BackupHandler::new(Console::from_writer(Vec::new()), Arc::new(fixture.store.clone()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = copy_graph(
            &fixture.store,
            &dst,
            &fixture.index,
            &handler,
            &CopyOptions::default(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(dst.is_empty().await);
    }
}
