//! Content fingerprints.
//!
//! A fingerprint is computed over the canonical JSON serialization of
//! [`ContentFields`]: trimmed values, keys in sorted order. Two submissions
//! with the same fields in a different order therefore share a fingerprint.

use sha2::{Digest, Sha256};

use memoboard_core::ContentFields;

/// Strategy for turning content into a stable hash string.
pub trait Fingerprinter: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    fn fingerprint(&self, content: &ContentFields) -> String;
}

fn canonical_json(content: &ContentFields) -> String {
    // A map of strings always serializes.
    serde_json::to_string(content).unwrap_or_default()
}

/// SHA-256 over the canonical JSON, formatted `sha256:<hex>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn fingerprint(&self, content: &ContentFields) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(content).as_bytes());
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

/// 32-bit multiplicative rolling hash, base-36 encoded.
///
/// Matches records written by older clients. Collisions are expected at
/// volume; prefer [`Sha256Fingerprinter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingHashFingerprinter;

impl Fingerprinter for RollingHashFingerprinter {
    fn name(&self) -> &'static str {
        "rolling32"
    }

    fn fingerprint(&self, content: &ContentFields) -> String {
        rolling_hash(&canonical_json(content))
    }
}

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wrapping, then the
/// absolute value in base 36.
pub fn rolling_hash(input: &str) -> String {
    let hash = input
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32));
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
