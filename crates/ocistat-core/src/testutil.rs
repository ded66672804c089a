//! Test doubles shared by the unit tests.

use crate::prompt::{Prompt, Verb, status_line};
use crate::storage::{ByteStream, Fetcher, MemoryStore};
use crate::{Error, Result};
use async_trait::async_trait;
use ocistat_schema::{Descriptor, Digest, ImageIndex, ImageManifest, media_type};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory writer whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prompt that records every report.
#[derive(Debug, Default)]
pub(crate) struct RecordingPrompt {
    events: Mutex<Vec<(Digest, Verb, String)>>,
}

impl RecordingPrompt {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count_for(&self, digest: &Digest) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _, _)| d == digest)
            .count()
    }

    pub(crate) fn verbs_for(&self, digest: &Digest) -> Vec<Verb> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _, _)| d == digest)
            .map(|(_, verb, _)| *verb)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl Prompt for RecordingPrompt {
    fn report(&self, desc: &Descriptor, verb: Verb) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((desc.digest.clone(), verb, status_line(verb, desc)));
        Ok(())
    }
}

/// Prompt that fails every report with the same message.
#[derive(Debug)]
pub(crate) struct ErrorPrompt {
    message: &'static str,
}

impl ErrorPrompt {
    pub(crate) fn new(message: &'static str) -> Arc<Self> {
        Arc::new(Self { message })
    }
}

impl Prompt for ErrorPrompt {
    fn report(&self, _: &Descriptor, _: Verb) -> Result<()> {
        Err(Error::Report(io::Error::other(self.message)))
    }
}

/// Assert `err` is the report error produced by an [`ErrorPrompt`].
pub(crate) fn assert_report_error(err: &Error, message: &str) {
    match err {
        Error::Report(e) => assert_eq!(e.to_string(), message),
        other => panic!("expected report error `{message}`, got {other:?}"),
    }
}

/// Fetcher wrapper that counts calls.
#[derive(Debug)]
pub(crate) struct CountingFetcher<F> {
    inner: F,
    calls: AtomicUsize,
}

impl<F> CountingFetcher<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for CountingFetcher<F> {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(desc).await
    }
}

/// Fetcher that always fails.
#[derive(Debug, Default)]
pub(crate) struct ErrorFetcher;

impl ErrorFetcher {
    pub(crate) const MESSAGE: &'static str = "fetch failed";
}

#[async_trait]
impl Fetcher for ErrorFetcher {
    async fn fetch(&self, desc: &Descriptor) -> Result<ByteStream> {
        Err(Error::transfer(
            &desc.digest,
            io::Error::other(Self::MESSAGE),
        ))
    }
}

/// A small graph held in a [`MemoryStore`].
///
/// ```text
/// index ──> manifest ──> config, layer1 (hello.txt), layer2 (world.txt)
/// sibling ──> config, layer1 (hello.txt)
/// referrer ──> empty config, signature   (subject: manifest)
/// ```
#[derive(Debug)]
pub(crate) struct Fixture {
    pub(crate) store: MemoryStore,
    pub(crate) config: Descriptor,
    pub(crate) layer1: Descriptor,
    pub(crate) layer2: Descriptor,
    pub(crate) manifest: Descriptor,
    pub(crate) sibling: Descriptor,
    pub(crate) index: Descriptor,
    pub(crate) referrer: Descriptor,
}

impl Fixture {
    pub(crate) async fn new() -> Self {
        let store = MemoryStore::new();

        let config =
            blob(&store, media_type::OCI_CONFIG, br#"{"architecture":"amd64"}"#, None).await;
        let layer1 = blob(&store, media_type::OCI_LAYER, b"hello", Some("hello.txt")).await;
        let layer2 = blob(&store, media_type::OCI_LAYER, b"world", Some("world.txt")).await;
        let manifest = image(&store, &config, &[&layer1, &layer2], None).await;
        let sibling = image(&store, &config, &[&layer1], None).await;

        let index_doc = ImageIndex {
            schema_version: 2,
            media_type: Some(media_type::OCI_INDEX.to_string()),
            manifests: vec![manifest.clone()],
            subject: None,
            annotations: BTreeMap::new(),
        };
        let index = json(&store, media_type::OCI_INDEX, &index_doc).await;

        let empty = blob(&store, media_type::OCI_EMPTY, b"{}", None).await;
        let signature = blob(&store, "application/vnd.example.sig", b"sig", Some("sig")).await;
        let referrer = image(&store, &empty, &[&signature], Some(&manifest)).await;

        Self {
            store,
            config,
            layer1,
            layer2,
            manifest,
            sibling,
            index,
            referrer,
        }
    }
}

async fn blob(
    store: &MemoryStore,
    media_type: &str,
    content: &'static [u8],
    title: Option<&str>,
) -> Descriptor {
    let mut desc = Descriptor::new(media_type, content);
    if let Some(title) = title {
        desc = desc.with_title(title);
    }
    store.insert(&desc, content).await;
    desc
}

async fn image(
    store: &MemoryStore,
    config: &Descriptor,
    layers: &[&Descriptor],
    subject: Option<&Descriptor>,
) -> Descriptor {
    let doc = ImageManifest {
        schema_version: 2,
        media_type: Some(media_type::OCI_MANIFEST.to_string()),
        artifact_type: None,
        config: config.clone(),
        layers: layers.iter().map(|d| (*d).clone()).collect(),
        subject: subject.cloned(),
        annotations: BTreeMap::new(),
    };
    json(store, media_type::OCI_MANIFEST, &doc).await
}

async fn json<T: serde::Serialize>(store: &MemoryStore, media_type: &str, doc: &T) -> Descriptor {
    let bytes = serde_json::to_vec(doc).unwrap();
    let desc = Descriptor::new(media_type, &bytes);
    store.insert(&desc, bytes).await;
    desc
}
