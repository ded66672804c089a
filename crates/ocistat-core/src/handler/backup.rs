use super::{CopyHandler, Reporting};
use crate::Result;
use crate::prompt::{Console, Verb};
use crate::storage::Fetcher;
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports a backup of remote content into a local layout.
#[derive(Debug)]
pub struct BackupHandler {
    reporting: Reporting,
    fetcher: Arc<dyn Fetcher>,
}

impl BackupHandler {
    /// `fetcher` resolves successors, normally the source being backed up.
    pub fn new(console: Console, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            reporting: Reporting::new(console, Verb::Downloading, Verb::Downloaded),
            fetcher,
        }
    }
}

#[async_trait]
impl CopyHandler for BackupHandler {
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

delegate_tracking!(BackupHandler);
