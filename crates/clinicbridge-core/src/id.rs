//! ID generation utilities.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a new UUID v4.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a SHA256 hash of the input bytes.
pub fn sha256(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Short, log-safe fingerprint of sensitive material (first 12 hex chars of SHA256).
pub fn fingerprint(input: &[u8]) -> String {
    sha256(input)[..12].to_string()
}
