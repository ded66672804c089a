//! Content digests: `<algorithm>:<hex>`.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Number of hex characters shown in status lines.
pub const SHORT_DIGEST_LEN: usize = 12;

/// Errors raised while parsing a digest string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The string has no `algorithm:` prefix.
    #[error("Invalid digest: missing algorithm prefix in '{0}'")]
    MissingAlgorithm(String),

    /// The algorithm is not one we can address content with.
    #[error("Invalid digest: unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The encoded portion has the wrong length for its algorithm.
    #[error("Invalid digest: expected {expected} hex characters, got {actual} in '{digest}'")]
    InvalidLength {
        /// The full digest string.
        digest: String,
        /// Hex length the algorithm requires.
        expected: usize,
        /// Hex length that was supplied.
        actual: usize,
    },

    /// The encoded portion contains non-hex characters.
    #[error("Invalid digest: contains non-hex characters in '{0}'")]
    NonHex(String),
}

/// Content-derived identity of an object: `<algorithm>:<hex>`.
///
/// Validated at construction and deserialization time so an invalid digest
/// never reaches the registry or a storage backend. The hex portion is
/// normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct Digest {
    algorithm: &'static str,
    encoded: String,
}

impl Digest {
    /// Parse and validate a digest string such as `sha256:e3b0...`.
    ///
    /// # Errors
    ///
    /// Returns a [`DigestError`] if the prefix is missing or unknown, or if
    /// the hex portion has the wrong length or alphabet.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| DigestError::MissingAlgorithm(s.to_string()))?;

        let (algorithm, expected) = match algorithm {
            "sha256" => ("sha256", 64),
            "sha512" => ("sha512", 128),
            other => return Err(DigestError::UnsupportedAlgorithm(other.to_string())),
        };

        if hex.len() != expected {
            return Err(DigestError::InvalidLength {
                digest: s.to_string(),
                expected,
                actual: hex.len(),
            });
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::NonHex(s.to_string()));
        }

        Ok(Self {
            algorithm,
            encoded: hex.to_lowercase(),
        })
    }

    /// Compute the SHA-256 digest of `data`.
    pub fn sha256_of(data: &[u8]) -> Self {
        Self {
            algorithm: "sha256",
            encoded: hex::encode(Sha256::digest(data)),
        }
    }

    /// The algorithm name, e.g. `sha256`.
    pub fn algorithm(&self) -> &str {
        self.algorithm
    }

    /// The lowercase hex portion.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Abbreviated form used in status lines.
    pub fn short(&self) -> &str {
        &self.encoded[..SHORT_DIGEST_LEN]
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}

impl std::str::FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn sha256_of_empty_matches_known_value() {
        assert_eq!(Digest::sha256_of(b"").to_string(), EMPTY_SHA256);
    }

    #[test]
    fn parse_normalizes_case() {
        let upper = EMPTY_SHA256.replace("e3b0", "E3B0");
        let digest = Digest::parse(&upper).unwrap();
        assert_eq!(digest.to_string(), EMPTY_SHA256);
        assert_eq!(digest.algorithm(), "sha256");
    }

    #[test]
    fn short_is_twelve_hex_chars() {
        let digest = Digest::parse(EMPTY_SHA256).unwrap();
        assert_eq!(digest.short(), "e3b0c44298fc");
    }

    #[test]
    fn rejects_malformed_digests() {
        assert!(matches!(
            Digest::parse("e3b0c442"),
            Err(DigestError::MissingAlgorithm(_))
        ));
        assert!(matches!(
            Digest::parse("md5:abcd"),
            Err(DigestError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            Digest::parse("sha256:abcd"),
            Err(DigestError::InvalidLength { expected: 64, actual: 4, .. })
        ));
        let bad_hex = format!("sha256:{}", "z".repeat(64));
        assert!(matches!(Digest::parse(&bad_hex), Err(DigestError::NonHex(_))));
    }

    #[test]
    fn serde_uses_string_form() {
        let digest = Digest::sha256_of(b"hello");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{digest}\""));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
        assert!(serde_json::from_str::<Digest>("\"sha256:nope\"").is_err());
    }
}
