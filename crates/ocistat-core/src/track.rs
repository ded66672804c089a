//! Tracked target: a storage wrapper that feeds pushed bytes into the live view.

use crate::Result;
use crate::prompt::{Console, Prompt, Verb};
use crate::storage::{ByteStream, Fetcher, Storage};
use crate::view::LiveView;
use async_trait::async_trait;
use futures::StreamExt;
use ocistat_schema::Descriptor;

/// Wraps a [`Storage`] so that every push shows up as an in-flight row.
///
/// Fetches and existence checks pass straight through. Status lines reported
/// through the target are printed above the in-flight block so the two never
/// interleave.
#[derive(Debug)]
pub struct TrackedTarget<S> {
    inner: S,
    view: LiveView,
}

impl<S: Storage> TrackedTarget<S> {
    /// Start tracking `inner` on `console`, labelling transfers with `verb`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotTerminal`] if `console` is not interactive;
    /// no view is created in that case.
    pub fn new(inner: S, console: &Console, verb: Verb) -> Result<Self> {
        let view = LiveView::start(console, verb)?;
        Ok(Self { inner, view })
    }

    /// Release the live view. Idempotent.
    ///
    /// # Errors
    ///
    /// See [`LiveView::stop`].
    pub fn stop(&self) -> Result<()> {
        self.view.stop()
    }
}

#[async_trait]
impl<S: Storage> Fetcher for TrackedTarget<S> {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        self.inner.fetch(desc).await
    }
}

#[async_trait]
impl<S: Storage> Storage for TrackedTarget<S> {
    async fn exists(&self, desc: &Descriptor) -> Result<bool> {
        self.inner.exists(desc).await
    }

    async fn push(&self, desc: &Descriptor, content: ByteStream) -> Result<()> {
        let progress = self.view.track(desc);
        let counted = content
            .map(move |chunk| {
                if let Ok(bytes) = &chunk {
                    progress.advance(bytes.len() as u64);
                }
                chunk
            })
            .boxed();
        self.inner.push(desc, counted).await
    }
}

impl<S: Storage> Prompt for TrackedTarget<S> {
    fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        self.view.report(desc, verb)
    }
}
