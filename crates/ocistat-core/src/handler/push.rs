use super::{CopyHandler, Reporting};
use crate::Result;
use crate::prompt::{Console, Verb};
use crate::storage::Fetcher;
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Reports a push (or an attach) of local files to a target.
///
/// Successors of pushed manifests are resolved through the fetcher given at
/// construction, normally the local store the files were packed into.
#[derive(Debug)]
pub struct PushHandler {
    reporting: Reporting,
    fetcher: Arc<dyn Fetcher>,
    attach: bool,
}

impl PushHandler {
    /// Handler for a push.
    pub fn new(console: Console, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::build(Reporting::new(console, Verb::Uploading, Verb::Uploaded), fetcher, false)
    }

    /// Handler for attaching a referrer to an existing subject.
    pub fn attach(console: Console, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::build(Reporting::new(console, Verb::Uploading, Verb::Uploaded), fetcher, true)
    }

    fn build(reporting: Reporting, fetcher: Arc<dyn Fetcher>, attach: bool) -> Self {
        Self {
            reporting,
            fetcher,
            attach,
        }
    }

    /// A file is being read into the local store.
    ///
    /// # Errors
    ///
    /// Never fails; the live view already shows the file.
    pub fn on_file_loading(&self, name: &str) -> Result<()> {
        tracing::debug!(file = name, attach = self.attach, "loading");
        Ok(())
    }

    /// The artifact carries no files.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn on_empty_artifact(&self) -> Result<()> {
        tracing::debug!(attach = self.attach, "empty artifact");
        Ok(())
    }
}

#[async_trait]
impl CopyHandler for PushHandler {
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

delegate_tracking!(PushHandler);
