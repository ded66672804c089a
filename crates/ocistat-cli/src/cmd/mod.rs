pub mod copy;
pub mod push_blob;

use anyhow::{Context, Result};
use ocistat_core::storage::{Fetcher, fetch_all};
use ocistat_schema::{Descriptor, Digest, media_type};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Build the root descriptor for `digest` from the content in `store`.
///
/// Layouts address blobs by digest only, so the media type is taken from the
/// content itself: a JSON document declaring a manifest or index media type
/// is treated as one, anything else as an opaque blob.
pub async fn resolve_root<F: Fetcher + ?Sized>(store: &F, digest: &str) -> Result<Descriptor> {
    let digest = Digest::parse(digest).with_context(|| format!("invalid digest '{digest}'"))?;
    let mut desc = Descriptor {
        media_type: media_type::OCTET_STREAM.to_string(),
        digest,
        size: 0,
        artifact_type: None,
        annotations: BTreeMap::new(),
    };
    let content = fetch_all(store, &desc)
        .await
        .with_context(|| format!("failed to read {}", desc.digest))?;
    if desc.digest.algorithm() == "sha256" && Digest::sha256_of(&content) != desc.digest {
        anyhow::bail!("content of {} does not match its digest", desc.digest);
    }

    desc.size = content.len() as u64;
    if let Some(declared) = declared_media_type(&content) {
        desc.media_type = declared;
    }
    tracing::debug!(
        digest = %desc.digest,
        media_type = %desc.media_type,
        size = desc.size,
        "resolved root"
    );
    Ok(desc)
}

fn declared_media_type(content: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(content).ok()?;
    let declared = value.get("mediaType")?.as_str()?;
    media_type::may_have_successors(declared).then(|| declared.to_string())
}

/// Token cancelled on Ctrl-C.
pub fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted");
            token.cancel();
        }
    });
    cancel
}
