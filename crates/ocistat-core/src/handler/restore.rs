use super::{CopyHandler, Reporting};
use crate::Result;
use crate::prompt::{Console, Verb};
use crate::storage::Fetcher;
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports a restore of a local layout back to a target.
#[derive(Debug)]
pub struct RestoreHandler {
    reporting: Reporting,
    fetcher: Arc<dyn Fetcher>,
}

impl RestoreHandler {
    /// `fetcher` resolves successors, normally the layout being restored.
    pub fn new(console: Console, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            reporting: Reporting::new(console, Verb::Uploading, Verb::Restored),
            fetcher,
        }
    }
}

#[async_trait]
impl CopyHandler for RestoreHandler {
    async fn pre_copy(&self, _: &CancellationToken, _: &Descriptor) -> Result<()> {
        Ok(())
    }

    async fn post_copy(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        self.reporting.post_copy(cancel, &*self.fetcher, desc).await
    }

    async fn on_copy_skipped(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        self.reporting.on_copy_skipped(cancel, desc)
    }
}

delegate_tracking!(RestoreHandler);
