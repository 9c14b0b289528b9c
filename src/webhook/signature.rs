//! Webhook delivery signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw request body and
//! sends the hex digest in the `X-Hub-Signature-256` header, prefixed with
//! `sha256=`. Verification recomputes the digest and compares in constant
//! time.

use sha2::digest::Output;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// SHA-256 block size; HMAC pads or hashes the key to this width.
const BLOCK_SIZE: usize = 64;

/// Result type for signature checks.
pub type SignatureResult<T> = Result<T, SignatureError>;

/// Why a delivery was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The delivery carried no signature header at all.
    #[error("X-Hub-Signature-256 header is missing")]
    MissingHeader,

    /// The signature did not match the shared secret.
    #[error("Delivery signature did not match")]
    Mismatch,
}

/// Compute the `sha256=<hex>` signature for a delivery body.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    format!("sha256={:x}", hmac_sha256(secret.as_bytes(), body))
}

/// Verify a delivery against the shared secret.
pub fn verify_signature(
    secret: &str,
    body: &[u8],
    signature_header: Option<&str>,
) -> SignatureResult<()> {
    let header = signature_header.ok_or(SignatureError::MissingHeader)?;
    let expected = compute_signature(secret, body);

    if constant_time_eq(expected.as_bytes(), header.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// HMAC-SHA256 (RFC 2104) built on the sha2 primitives.
fn hmac_sha256(key: &[u8], message: &[u8]) -> Output<Sha256> {
    let mut block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        block[..32].copy_from_slice(&Sha256::digest(key));
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let ipad: Vec<u8> = block.iter().map(|b| b ^ 0x36).collect();
    let opad: Vec<u8> = block.iter().map(|b| b ^ 0x5c).collect();

    let mut inner = Sha256::new();
    inner.update(&ipad);
    inner.update(message);
    let inner_digest = inner.finalize();

    let mut outer = Sha256::new();
    outer.update(&opad);
    outer.update(inner_digest);
    outer.finalize()
}

/// Byte comparison that does not short-circuit on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_rfc4231_vector() {
        // RFC 4231 test case 2.
        let digest = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            format!("{:x}", digest),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_sha256_long_key_is_hashed_first() {
        // RFC 4231 test case 6: 131-byte key forces the hash-the-key path.
        let key = [0xaa_u8; 131];
        let digest = hmac_sha256(&key, b"Test Using Larger Than Block-Size Key - Hash Key First");
        assert_eq!(
            format!("{:x}", digest),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn test_verify_round_trip() {
        let body = br#"{"action":"published"}"#;
        let signature = compute_signature("topsecret", body);
        assert!(signature.starts_with("sha256="));

        assert_eq!(verify_signature("topsecret", body, Some(&signature)), Ok(()));
    }

    #[test]
    fn test_verify_rejects_missing_header() {
        assert_eq!(
            verify_signature("topsecret", b"body", None),
            Err(SignatureError::MissingHeader)
        );
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let signature = compute_signature("topsecret", b"body");
        assert_eq!(
            verify_signature("other", b"body", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let signature = compute_signature("topsecret", b"body");
        assert_eq!(
            verify_signature("topsecret", b"tampered", Some(&signature)),
            Err(SignatureError::Mismatch)
        );
    }
}
