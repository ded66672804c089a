use super::{CopyHandler, Reporting, ensure_live};
use crate::Result;
use crate::prompt::{Console, Verb};
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use tokio_util::sync::CancellationToken;

/// Reports a pull into local files.
///
/// Pulled nodes are reported one by one as they land, so the post-copy hook
/// never resolves successors.
#[derive(Debug)]
pub struct PullHandler {
    reporting: Reporting,
}

impl PullHandler {
    /// Handler printing to `console`.
    pub fn new(console: Console) -> Self {
        Self {
            reporting: Reporting::new(console, Verb::Downloading, Verb::Downloaded),
        }
    }

    /// A node started downloading.
    ///
    /// # Errors
    ///
    /// Never fails; the live view shows in-flight nodes.
    pub fn on_node_downloading(&self, desc: &Descriptor) -> Result<()> {
        tracing::trace!(digest = %desc.digest, "downloading");
        Ok(())
    }

    /// A node finished downloading.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged.
    pub fn on_node_downloaded(&self, desc: &Descriptor) -> Result<()> {
        self.reporting.report_once(desc, Verb::Downloaded)
    }

    /// A downloaded node is being written out.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn on_node_processing(&self, desc: &Descriptor) -> Result<()> {
        tracing::trace!(digest = %desc.digest, "processing");
        Ok(())
    }

    /// A node was restored from a local copy instead of downloaded.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged.
    pub fn on_node_restored(&self, desc: &Descriptor) -> Result<()> {
        self.reporting.report_once(desc, Verb::Restored)
    }

    /// A node was left out of the pull.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged.
    pub fn on_node_skipped(&self, desc: &Descriptor) -> Result<()> {
        self.reporting.report_once(desc, Verb::Skipped)
    }
}

#[async_trait]
impl CopyHandler for PullHandler {
    async fn pre_copy(&self, _: &CancellationToken, _: &Descriptor) -> Result<()> {
        Ok(())
    }

    async fn post_copy(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        ensure_live(cancel)?;
        self.on_node_downloaded(desc)
    }

    async fn on_copy_skipped(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        self.reporting.on_copy_skipped(cancel, desc)
    }
}

delegate_tracking!(PullHandler);
