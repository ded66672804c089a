use super::{CopyHandler, Reporting, Tracking};
use crate::Result;
use crate::prompt::{Console, Verb};
use crate::storage::Storage;
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports a generic copy between two targets.
///
/// Successors are read back from the destination, which holds every manifest
/// by the time its post-copy hook runs. Once tracking starts, reads go
/// through the tracked target.
#[derive(Debug)]
pub struct TransferHandler {
    reporting: Reporting,
    target: Arc<dyn Storage>,
}

impl TransferHandler {
    /// Handler copying into `target`.
    pub fn new(console: Console, target: Arc<dyn Storage>) -> Self {
        Self {
            reporting: Reporting::new(console, Verb::Copying, Verb::Copied),
            target,
        }
    }

    /// The blob was mounted from another repository instead of copied.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged, or [`crate::Error::Cancelled`].
    pub fn on_mounted(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        super::ensure_live(cancel)?;
        self.reporting.report_once(desc, Verb::Mounted)
    }
}

#[async_trait]
impl CopyHandler for TransferHandler {
    async fn pre_copy(&self, _: &CancellationToken, _: &Descriptor) -> Result<()> {
        Ok(())
    }

    async fn post_copy(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        self.reporting.post_copy(cancel, &*self.target, desc).await
    }

    async fn on_copy_skipped(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        self.reporting.on_copy_skipped(cancel, desc)
    }
}

impl Tracking for TransferHandler {
    fn start_tracking(&mut self, target: Arc<dyn Storage>) -> Result<Arc<dyn Storage>> {
        let tracked: Arc<dyn Storage> = self.reporting.start_tracking(target)?;
        self.target = Arc::clone(&tracked);
        Ok(tracked)
    }

    fn stop_tracking(&self) -> Result<()> {
        self.reporting.stop_tracking()
    }
}
