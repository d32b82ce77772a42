//! Content hashing for cache identity.
//!
//! Two key domains share one cache: documents are keyed by a digest of their raw
//! source bytes, queries by a digest of the text actually sent for embedding. Each
//! domain hashes under its own BLAKE3 derive-key context, so a query whose text
//! equals some file's bytes still gets a distinct key.

use std::fmt;
use std::str::FromStr;

use blake3::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DOCUMENT_BYTES_CONTEXT: &str = "exemplar-cache 2026 document source bytes";
const QUERY_TEXT_CONTEXT: &str = "exemplar-cache 2026 embedding input text";

/// 256-bit BLAKE3 digest, rendered as lowercase hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wraps raw digest bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the 64-character lowercase hex form.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }

    /// Parses the hex form produced by [`ContentHash::to_hex`].
    pub fn from_hex(hex: &str) -> Option<Self> {
        blake3::Hash::from_hex(hex)
            .ok()
            .map(|hash| Self(*hash.as_bytes()))
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl FromStr for ContentHash {
    type Err = blake3::HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        blake3::Hash::from_hex(s).map(|hash| Self(*hash.as_bytes()))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}

/// Digest of raw document source bytes.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    hash_byte_parts(&[bytes])
}

/// Digest over several byte sources treated as one document.
///
/// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
/// A single part hashes identically to [`hash_bytes`].
pub fn hash_byte_parts(parts: &[&[u8]]) -> ContentHash {
    let mut hasher = Hasher::new_derive_key(DOCUMENT_BYTES_CONTEXT);
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    ContentHash(*hasher.finalize().as_bytes())
}

/// Digest of text sent to the embedding provider.
#[inline]
pub fn hash_text(text: &str) -> ContentHash {
    let mut hasher = Hasher::new_derive_key(QUERY_TEXT_CONTEXT);
    hasher.update(text.as_bytes());
    ContentHash(*hasher.finalize().as_bytes())
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Only for bucketing and similar non-identity uses; cache keys always use the
/// full [`ContentHash`].
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}
