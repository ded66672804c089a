//! Committed-content registry.
//!
//! Records which digests already had their terminal status line printed in
//! the current run. Inserting is the only signal that matters: whoever
//! inserts a digest first prints its line, everyone after stays quiet.

use ocistat_schema::{Descriptor, Digest};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only map from digest to the title it was first reported under.
#[derive(Debug, Default)]
pub struct Committed {
    entries: Mutex<HashMap<Digest, String>>,
}

impl Committed {
    /// Create an empty registry for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically record `digest` under `title`.
    ///
    /// Returns `true` if the digest was already committed, in which case the
    /// stored title is left untouched. Of any number of concurrent callers
    /// racing on the same digest, exactly one sees `false`.
    pub fn try_commit(&self, digest: &Digest, title: &str) -> bool {
        match self.lock().entry(digest.clone()) {
            Entry::Occupied(existing) => {
                if existing.get() != title {
                    tracing::trace!(
                        %digest,
                        committed = %existing.get(),
                        title,
                        "digest already committed under another title"
                    );
                }
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(title.to_string());
                false
            }
        }
    }

    /// Commit a descriptor under its title (empty when it has none).
    pub fn try_commit_desc(&self, desc: &Descriptor) -> bool {
        self.try_commit(&desc.digest, desc.title().unwrap_or_default())
    }

    /// Title the digest was committed under, if any.
    pub fn title_of(&self, digest: &Digest) -> Option<String> {
        self.lock().get(digest).cloned()
    }

    /// Whether the digest has been committed.
    pub fn contains(&self, digest: &Digest) -> bool {
        self.lock().contains_key(digest)
    }

    /// Number of distinct digests committed so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-written:
    // every critical section is a single insert or read.
    fn lock(&self) -> MutexGuard<'_, HashMap<Digest, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
