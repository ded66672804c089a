//! Manifest and index documents.
//!
//! Only the fields needed to walk the graph are modelled; anything else in
//! the JSON is ignored. Schema validation is left to the registry.

use crate::{Descriptor, media_type};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while parsing a manifest or index.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The bytes are not valid JSON for the declared media type.
    #[error("malformed {media_type} content: {source}")]
    Json {
        /// Declared media type of the content.
        media_type: String,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The document declares a different media type than its descriptor.
    #[error("media type mismatch: descriptor says {expected}, content says {actual}")]
    MediaTypeMismatch {
        /// Media type from the descriptor.
        expected: String,
        /// Media type embedded in the document.
        actual: String,
    },

    /// The media type does not describe a manifest or index.
    #[error("{0} is not a manifest or index media type")]
    NotAManifest(String),
}

/// An image (or artifact) manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version, always 2.
    pub schema_version: u32,

    /// Embedded media type, if the producer set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Artifact type for artifact manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Config blob.
    pub config: Descriptor,

    /// Layer blobs in order.
    #[serde(default)]
    pub layers: Vec<Descriptor>,

    /// Manifest this one refers to, for referrers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// An image index / manifest list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    /// Schema version, always 2.
    pub schema_version: u32,

    /// Embedded media type, if the producer set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// Child manifests.
    #[serde(default)]
    pub manifests: Vec<Descriptor>,

    /// Manifest this one refers to, for referrers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Descriptor>,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A parsed node that can have successors.
#[derive(Debug, Clone)]
pub enum Manifest {
    /// Image or artifact manifest.
    Image(ImageManifest),
    /// Index or manifest list.
    Index(ImageIndex),
}

impl Manifest {
    /// Parse `content` according to `media_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::NotAManifest`] for leaf media types,
    /// [`ParseError::Json`] when decoding fails, and
    /// [`ParseError::MediaTypeMismatch`] when the document embeds a
    /// conflicting media type.
    pub fn parse(media_type: &str, content: &[u8]) -> Result<Self, ParseError> {
        let json_err = |source| ParseError::Json {
            media_type: media_type.to_string(),
            source,
        };

        let (parsed, embedded) = if media_type::is_manifest(media_type) {
            let manifest: ImageManifest = serde_json::from_slice(content).map_err(json_err)?;
            let embedded = manifest.media_type.clone();
            (Self::Image(manifest), embedded)
        } else if media_type::is_index(media_type) {
            let index: ImageIndex = serde_json::from_slice(content).map_err(json_err)?;
            let embedded = index.media_type.clone();
            (Self::Index(index), embedded)
        } else {
            return Err(ParseError::NotAManifest(media_type.to_string()));
        };

        match embedded {
            Some(actual) if actual != media_type => Err(ParseError::MediaTypeMismatch {
                expected: media_type.to_string(),
                actual,
            }),
            _ => Ok(parsed),
        }
    }

    /// Content this node owns: config then layers, or child manifests.
    pub fn children(&self) -> Vec<Descriptor> {
        match self {
            Self::Image(m) => std::iter::once(m.config.clone())
                .chain(m.layers.iter().cloned())
                .collect(),
            Self::Index(i) => i.manifests.clone(),
        }
    }

    /// The referenced subject, if this node is a referrer.
    pub fn subject(&self) -> Option<&Descriptor> {
        match self {
            Self::Image(m) => m.subject.as_ref(),
            Self::Index(i) => i.subject.as_ref(),
        }
    }
}
