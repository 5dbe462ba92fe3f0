//! Cryptographic primitives for the Docchain engine
//!
//! This module provides domain-separated hashing. Every record kind hashes
//! under its own domain so that two records with identical content but
//! different kinds can never collide on an id.
//!
//! Signature verification is deliberately absent: the engine stores
//! signatures (`usig`, `qsig`) as opaque strings and treats verification as
//! a delegated concern.

mod hasher;

pub use hasher::Blake2sHasher;
pub use hasher::SecureHasher;
pub use hasher::Sha256Hasher;

use constant_time_eq::constant_time_eq;

/// Create a domain-separated secure hash using SHA-256
///
/// # Arguments
///
/// * `domain` - Domain prefix (e.g., "DOCCHAIN_BLOCK")
/// * `data` - Data to hash
///
/// # Returns
///
/// A 32-byte secure hash with domain separation
pub fn secure_hash(domain: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256Hasher::new();
    hasher.hash_with_domain(domain, data)
}

/// Create a domain-separated secure hash of multiple inputs
///
/// Each element is length-prefixed so that moving bytes between adjacent
/// elements changes the digest.
///
/// # Arguments
///
/// * `domain` - Domain prefix (e.g., "DOCCHAIN_BLOCK")
/// * `data` - Vector of data to hash
///
/// # Returns
///
/// A 32-byte secure hash with domain separation
pub fn secure_hash_multiple(domain: &str, data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256Hasher::new();
    hasher.hash_multiple_with_domain(domain, data)
}

/// Verify a hash in constant time to prevent timing attacks
///
/// # Arguments
///
/// * `expected` - Expected hash value
/// * `actual` - Actual hash value to verify
///
/// # Returns
///
/// True if the hashes match, false otherwise
pub fn verify_hash(expected: &[u8; 32], actual: &[u8; 32]) -> bool {
    constant_time_eq(expected, actual)
}

/// Compare two hex-encoded digests in constant time
///
/// Non-hex or wrong-length input never matches.
pub fn verify_hex_digest(expected: &str, actual: &str) -> bool {
    let expected = match decode_digest(expected) {
        Some(digest) => digest,
        None => return false,
    };
    let actual = match decode_digest(actual) {
        Some(digest) => digest,
        None => return false,
    };
    verify_hash(&expected, &actual)
}

fn decode_digest(digest: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(digest).ok()?;
    let mut output = [0u8; 32];
    if bytes.len() != 32 {
        return None;
    }
    output.copy_from_slice(&bytes);
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_hash() {
        let data = b"test data";
        let hash = secure_hash("TEST", data);

        // Same inputs should produce the same hash
        let hash2 = secure_hash("TEST", data);
        assert_eq!(hash, hash2);

        // Different domain should produce different hash
        let hash3 = secure_hash("DIFFERENT", data);
        assert_ne!(hash, hash3);

        // Different data should produce different hash
        let hash4 = secure_hash("TEST", b"different data");
        assert_ne!(hash, hash4);
    }

    #[test]
    fn test_secure_hash_multiple() {
        let data1 = b"data1";
        let data2 = b"data2";

        let hash = secure_hash_multiple("TEST", &[data1, data2]);

        // Same inputs should produce the same hash
        let hash2 = secure_hash_multiple("TEST", &[data1, data2]);
        assert_eq!(hash, hash2);

        // Different order should produce different hash
        let hash3 = secure_hash_multiple("TEST", &[data2, data1]);
        assert_ne!(hash, hash3);

        // Concatenation should not work
        let mut concatenated = Vec::new();
        concatenated.extend_from_slice(data1);
        concatenated.extend_from_slice(data2);
        let hash4 = secure_hash("TEST", &concatenated);
        assert_ne!(hash, hash4);
    }

    #[test]
    fn test_verify_hash() {
        let data = b"test data";
        let hash = secure_hash("TEST", data);

        // Correct hash should verify
        assert!(verify_hash(&hash, &hash));

        // Different hash should not verify
        let different_hash = secure_hash("TEST", b"different data");
        assert!(!verify_hash(&hash, &different_hash));
    }

    #[test]
    fn test_verify_hex_digest() {
        let hash = secure_hash("TEST", b"test data");
        let encoded = hex::encode(hash);

        assert!(verify_hex_digest(&encoded, &encoded));
        assert!(!verify_hex_digest(&encoded, &hex::encode([0u8; 32])));

        // Malformed input never matches
        assert!(!verify_hex_digest(&encoded, "not hex"));
        assert!(!verify_hex_digest(&encoded, &encoded[..10]));
    }
}
