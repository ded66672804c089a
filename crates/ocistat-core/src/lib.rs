//! Deduplicated status reporting for DAG content copies.
//!
//! A copy engine calls [`CopyHandler`] hooks as it moves content between two
//! [`Storage`] targets. Handlers print at most one terminal status line per
//! distinct digest, no matter how many parents reach it or how many workers
//! race on it. On an interactive terminal, [`Tracking::start_tracking`] adds a
//! live view of in-flight transfers.

pub mod engine;
pub mod error;
pub mod handler;
pub mod prompt;
pub mod registry;
pub mod storage;
pub mod successors;
pub mod track;
pub mod view;

#[cfg(test)]
mod testutil;

pub use engine::{CopyOptions, copy_graph};
pub use error::{Error, Result};
pub use handler::{
    BackupHandler, BlobPushHandler, CopyHandler, PullHandler, PushHandler, RestoreHandler,
    TransferHandler, Tracking,
};
pub use prompt::{Console, Prompt, Verb};
pub use registry::Committed;
pub use storage::{ByteStream, Fetcher, LayoutStore, MemoryStore, Storage};
pub use track::TrackedTarget;
