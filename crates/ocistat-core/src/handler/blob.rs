use super::Reporting;
use crate::Result;
use crate::prompt::{Console, Verb};
use ocistat_schema::Descriptor;

/// Reports the push of one standalone blob.
#[derive(Debug)]
pub struct BlobPushHandler {
    reporting: Reporting,
    desc: Descriptor,
}

impl BlobPushHandler {
    /// Handler for pushing the blob described by `desc`.
    pub fn new(console: Console, desc: Descriptor) -> Self {
        Self {
            reporting: Reporting::new(console, Verb::Uploading, Verb::Uploaded),
            desc,
        }
    }

    /// The blob being pushed.
    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// The target already has the blob.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged.
    pub fn on_blob_exists(&self) -> Result<()> {
        self.reporting.report_once(&self.desc, Verb::Exists)
    }

    /// The upload started.
    ///
    /// # Errors
    ///
    /// Never fails; the live view shows the upload.
    pub fn on_blob_uploading(&self) -> Result<()> {
        tracing::debug!(digest = %self.desc.digest, size = self.desc.size, "uploading blob");
        Ok(())
    }

    /// The upload finished.
    ///
    /// # Errors
    ///
    /// Returns the reporter's error unchanged.
    pub fn on_blob_uploaded(&self) -> Result<()> {
        self.reporting.report_once(&self.desc, Verb::Uploaded)
    }
}

delegate_tracking!(BlobPushHandler);
