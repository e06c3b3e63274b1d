//! Challenge–response credential hashing.
//!
//! The handshake is pluggable: the state machine only needs something that
//! turns `(partner id, secret, nonce)` into response bytes, so stronger
//! schemes can replace the legacy digest without touching any transition
//! logic.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use md5::{Digest, Md5};

/// Strategy for answering the host's nonce challenge.
pub trait CredentialHasher: Send + Sync {
    /// Compute the authentication response for `nonce`.
    fn respond(&self, partner_id: &str, secret: &str, nonce: &[u8]) -> Vec<u8>;
}

/// The deployed peer's double-MD5 digest.
///
/// `d1 = md5(id ‖ secret)`, `d2 = md5(base64(d1) ‖ base64(nonce))`; the
/// response is the raw 16 bytes of `d2`. The host computes the same value
/// and compares.
///
/// MD5 is not collision resistant; this hasher exists solely for wire
/// compatibility with existing hosts. New deployments should install a
/// modern [`CredentialHasher`] on both ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyMd5Hasher;

impl CredentialHasher for LegacyMd5Hasher {
    fn respond(&self, partner_id: &str, secret: &str, nonce: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(partner_id.as_bytes());
        hasher.update(secret.as_bytes());
        let first = hasher.finalize();

        let mut hasher = Md5::new();
        hasher.update(BASE64_STANDARD.encode(first).as_bytes());
        hasher.update(BASE64_STANDARD.encode(nonce).as_bytes());
        hasher.finalize().to_vec()
    }
}
