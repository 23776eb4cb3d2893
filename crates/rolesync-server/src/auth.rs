use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare a presented webhook secret against the configured one.
///
/// Both sides are hashed and the digests compared in constant time. A
/// missing or empty presented secret never matches.
pub fn secret_matches(presented: Option<&str>, expected: &str) -> bool {
    let Some(presented) = presented.filter(|s| !s.is_empty()) else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    bool::from(a.as_slice().ct_eq(b.as_slice()))
}
