//! Copy event handlers.
//!
//! The copy engine calls [`CopyHandler`] hooks for every node it visits.
//! Each variant decides, through its [`Committed`] registry, whether the
//! event is the first terminal event for that digest and only then prints a
//! status line. Whatever the reporter or successor resolution returns is
//! passed back unchanged.
//!
//! | variant              | in flight   | done       |
//! |----------------------|-------------|------------|
//! | [`PushHandler`]      | Uploading   | Uploaded   |
//! | [`PullHandler`]      | Downloading | Downloaded |
//! | [`BackupHandler`]    | Downloading | Downloaded |
//! | [`RestoreHandler`]   | Uploading   | Restored   |
//! | [`TransferHandler`]  | Copying     | Copied     |
//! | [`BlobPushHandler`]  | Uploading   | Uploaded   |

/// Implements [`Tracking`] for a variant that keeps its state in `reporting`.
macro_rules! delegate_tracking {
    ($handler:ty) => {
        impl $crate::handler::Tracking for $handler {
            fn start_tracking(
                &mut self,
                target: std::sync::Arc<dyn $crate::storage::Storage>,
            ) -> $crate::Result<std::sync::Arc<dyn $crate::storage::Storage>> {
                let tracked = self.reporting.start_tracking(target)?;
                Ok(tracked as std::sync::Arc<dyn $crate::storage::Storage>)
            }

            fn stop_tracking(&self) -> $crate::Result<()> {
                self.reporting.stop_tracking()
            }
        }
    };
}

mod backup;
mod blob;
mod pull;
mod push;
mod restore;
mod transfer;

pub use backup::BackupHandler;
pub use blob::BlobPushHandler;
pub use pull::PullHandler;
pub use push::PushHandler;
pub use restore::RestoreHandler;
pub use transfer::TransferHandler;

use crate::prompt::{Console, Prompt, Verb};
use crate::registry::Committed;
use crate::storage::{Fetcher, Storage};
use crate::successors::filtered_successors;
use crate::track::TrackedTarget;
use crate::{Error, Result};
use async_trait::async_trait;
use ocistat_schema::Descriptor;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Hooks the copy engine invokes per visited node.
///
/// Hooks take `&self` and may be called concurrently from any number of
/// workers.
#[async_trait]
pub trait CopyHandler: Send + Sync {
    /// Called right before the node's content is transferred.
    async fn pre_copy(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()>;

    /// Called after the node's content was transferred.
    async fn post_copy(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()>;

    /// Called instead of the other two when the destination already has
    /// the content.
    async fn on_copy_skipped(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()>;
}

/// Live-progress lifecycle of a handler.
pub trait Tracking {
    /// Wrap `target` so pushes show up in a live view on the handler's
    /// console, and route status lines through that view.
    ///
    /// Call once per run; a second call replaces (and stops) the first view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotTerminal`] if the console is not interactive; the
    /// handler keeps printing plain lines in that case.
    fn start_tracking(&mut self, target: Arc<dyn Storage>) -> Result<Arc<dyn Storage>>;

    /// Release the live view. Safe to call without a prior start and more
    /// than once. Later reports go straight to the console again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the view could not be shut down cleanly.
    fn stop_tracking(&self) -> Result<()>;
}

type Tracked = TrackedTarget<Arc<dyn Storage>>;

/// State every variant shares: where lines go and what was committed.
struct Reporting {
    console: Console,
    prompt: RwLock<Arc<dyn Prompt>>,
    committed: Committed,
    tracked: Option<Arc<Tracked>>,
    active: Verb,
    done: Verb,
}

impl Reporting {
    fn new(console: Console, active: Verb, done: Verb) -> Self {
        Self {
            prompt: RwLock::new(Arc::new(console.clone())),
            console,
            committed: Committed::new(),
            tracked: None,
            active,
            done,
        }
    }

    /// Bypass the console: report straight to `prompt`.
    #[cfg(test)]
    fn with_prompt(prompt: Arc<dyn Prompt>, active: Verb, done: Verb) -> Self {
        let reporting = Self::new(Console::from_writer(std::io::sink()), active, done);
        reporting.set_prompt(prompt);
        reporting
    }

    /// Print `verb` for `desc` unless the digest was already committed.
    fn report_once(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        if self.committed.try_commit_desc(desc) {
            tracing::trace!(digest = %desc.digest, %verb, "already reported");
            return Ok(());
        }
        let prompt = Arc::clone(&self.prompt.read().unwrap_or_else(PoisonError::into_inner));
        prompt.report(desc, verb)
    }

    fn set_prompt(&self, prompt: Arc<dyn Prompt>) {
        *self.prompt.write().unwrap_or_else(PoisonError::into_inner) = prompt;
    }

    /// Shared post-copy flow: the node, then successors nobody reported yet.
    async fn post_copy<F: Fetcher + ?Sized>(
        &self,
        cancel: &CancellationToken,
        fetcher: &F,
        desc: &Descriptor,
    ) -> Result<()> {
        ensure_live(cancel)?;
        self.report_once(desc, self.done)?;

        let successors = filtered_successors(cancel, fetcher, desc, |successor| {
            !self.committed.contains(&successor.digest)
        })
        .await?;
        tracing::debug!(
            digest = %desc.digest,
            successors = successors.len(),
            "post-copy"
        );
        for successor in &successors {
            ensure_live(cancel)?;
            self.report_once(successor, Verb::Skipped)?;
        }
        Ok(())
    }

    fn on_copy_skipped(&self, cancel: &CancellationToken, desc: &Descriptor) -> Result<()> {
        ensure_live(cancel)?;
        self.report_once(desc, Verb::Exists)
    }

    fn start_tracking(&mut self, target: Arc<dyn Storage>) -> Result<Arc<Tracked>> {
        let tracked = Arc::new(TrackedTarget::new(target, &self.console, self.active)?);
        self.set_prompt(Arc::clone(&tracked) as Arc<dyn Prompt>);
        if let Some(previous) = self.tracked.replace(Arc::clone(&tracked)) {
            previous.stop()?;
        }
        Ok(tracked)
    }

    fn stop_tracking(&self) -> Result<()> {
        let Some(tracked) = &self.tracked else {
            return Ok(());
        };
        self.set_prompt(Arc::new(self.console.clone()));
        tracked.stop()
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

impl std::fmt::Debug for Reporting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporting")
            .field("console", &self.console)
            .field("committed", &self.committed.len())
            .field("tracking", &self.tracked.is_some())
            .field("active", &self.active)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
