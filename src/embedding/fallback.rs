//! Deterministic fallback vectors.
//!
//! The vector is a pure function of the text: its [`hash_text`] digest seeds a
//! BLAKE3 extendable output, every two output bytes become one sign-centered
//! component, and the result is L2-normalized. Identical text yields a
//! bit-identical vector across processes and restarts.

use blake3::Hasher;

use crate::hashing::hash_text;

const FALLBACK_EXPANSION_CONTEXT: &str = "exemplar-cache 2026 fallback vector expansion";

/// Synthesizes a unit-length vector of `dim` components for `text`.
///
/// Returns an empty vector when `dim` is zero.
pub fn fallback_vector(text: &str, dim: usize) -> Vec<f32> {
    if dim == 0 {
        return Vec::new();
    }

    let digest = hash_text(text);
    let mut hasher = Hasher::new_derive_key(FALLBACK_EXPANSION_CONTEXT);
    hasher.update(digest.as_bytes());
    let mut reader = hasher.finalize_xof();

    let mut raw = vec![0u8; dim * 2];
    reader.fill(&mut raw);

    let mut vector: Vec<f32> = raw
        .chunks_exact(2)
        .map(|pair| {
            let value = u16::from_le_bytes([pair[0], pair[1]]);
            (value as f32 / u16::MAX as f32) * 2.0 - 1.0
        })
        .collect();

    normalize(&mut vector);
    vector
}

/// Scales `vector` to unit L2 norm in place (zero vectors are left untouched).
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
