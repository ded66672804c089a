//! Content descriptors.

use crate::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation key carrying a human-readable name for a blob.
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// Identifies one content-addressed object.
///
/// Descriptors are created by whoever produced the content (a manifest, the
/// copy engine, a CLI command) and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: String,

    /// Digest of the referenced content.
    pub digest: Digest,

    /// Size of the referenced content in bytes.
    pub size: u64,

    /// Artifact type, set on artifact manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    /// Arbitrary metadata; the title annotation names files.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Describe `data` with the given media type.
    pub fn new(media_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: Digest::sha256_of(data),
            size: data.len() as u64,
            artifact_type: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Attach a title annotation.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.annotations
            .insert(ANNOTATION_TITLE.to_string(), title.into());
        self
    }

    /// The title annotation, if present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.annotations
            .get(ANNOTATION_TITLE)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Name shown in status lines: the title, falling back to the media type.
    pub fn display_name(&self) -> &str {
        self.title().unwrap_or(&self.media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_type;

    #[test]
    fn display_name_prefers_title() {
        let desc = Descriptor::new(media_type::OCI_LAYER, b"layer").with_title("hello.txt");
        assert_eq!(desc.title(), Some("hello.txt"));
        assert_eq!(desc.display_name(), "hello.txt");
    }

    #[test]
    fn display_name_falls_back_to_media_type() {
        let desc = Descriptor::new(media_type::OCI_CONFIG, b"{}").with_title("");
        assert_eq!(desc.title(), None);
        assert_eq!(desc.display_name(), media_type::OCI_CONFIG);
    }

    #[test]
    fn deserializes_oci_json() {
        let json = r#"{
            "mediaType": "application/vnd.oci.image.layer.v1.tar",
            "digest": "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            "size": 0,
            "annotations": {"org.opencontainers.image.title": "empty.txt"}
        }"#;
        let desc: Descriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc.size, 0);
        assert_eq!(desc.title(), Some("empty.txt"));
        assert_eq!(desc.digest, Digest::sha256_of(b""));
    }
}
