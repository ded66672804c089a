//! Shared wire types for ocistat: digests, descriptors and manifests.

pub mod descriptor;
pub mod digest;
pub mod manifest;
pub mod media_type;

// Re-exports
pub use descriptor::{ANNOTATION_TITLE, Descriptor};
pub use digest::{Digest, DigestError, SHORT_DIGEST_LEN};
pub use manifest::{ImageIndex, ImageManifest, Manifest, ParseError};
