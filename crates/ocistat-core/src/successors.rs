//! Successor resolution: which descriptors a manifest or index refers to.

use crate::storage::{Fetcher, fetch_all};
use crate::{Error, Result};
use ocistat_schema::{Descriptor, Manifest, media_type};
use tokio_util::sync::CancellationToken;

/// All immediate successors of `desc`, including a referrer's subject.
///
/// Leaf media types resolve to an empty list without touching `fetcher`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] or [`Error::Transfer`] when the content cannot
/// be read, [`Error::Parse`] when it cannot be decoded, and
/// [`Error::Cancelled`] if `cancel` fires first.
pub async fn successors<F: Fetcher + ?Sized>(
    cancel: &CancellationToken,
    fetcher: &F,
    desc: &Descriptor,
) -> Result<Vec<Descriptor>> {
    let Some(manifest) = resolve(cancel, fetcher, desc).await? else {
        return Ok(Vec::new());
    };
    let mut nodes = manifest.children();
    nodes.extend(manifest.subject().cloned());
    Ok(nodes)
}

/// Successors that belong to the transfer: the subject of a referrer lives
/// outside it and is dropped.
///
/// # Errors
///
/// Same as [`successors`].
pub async fn scoped_successors<F: Fetcher + ?Sized>(
    cancel: &CancellationToken,
    fetcher: &F,
    desc: &Descriptor,
) -> Result<Vec<Descriptor>> {
    Ok(resolve(cancel, fetcher, desc)
        .await?
        .map(|manifest| manifest.children())
        .unwrap_or_default())
}

/// Scoped successors further narrowed by `keep`.
///
/// # Errors
///
/// Same as [`successors`].
pub async fn filtered_successors<F, P>(
    cancel: &CancellationToken,
    fetcher: &F,
    desc: &Descriptor,
    keep: P,
) -> Result<Vec<Descriptor>>
where
    F: Fetcher + ?Sized,
    P: Fn(&Descriptor) -> bool + Send,
{
    let mut nodes = scoped_successors(cancel, fetcher, desc).await?;
    nodes.retain(|d| keep(d));
    Ok(nodes)
}

async fn resolve<F: Fetcher + ?Sized>(
    cancel: &CancellationToken,
    fetcher: &F,
    desc: &Descriptor,
) -> Result<Option<Manifest>> {
    if !media_type::may_have_successors(&desc.media_type) {
        return Ok(None);
    }
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let content = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled),
        content = fetch_all(fetcher, desc) => content?,
    };

    let manifest =
        Manifest::parse(&desc.media_type, &content).map_err(|source| Error::Parse {
            digest: desc.digest.clone(),
            source,
        })?;
    tracing::trace!(
        digest = %desc.digest,
        children = manifest.children().len(),
        "resolved successors"
    );
    Ok(Some(manifest))
}
