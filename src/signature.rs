//! Keyed-hash verification for inbound gateway webhooks.
//!
//! The gateway signs the raw request body with HMAC-SHA512 over the shared
//! secret and sends the hex digest in the `X-Signature` header. Comparison
//! goes through `Mac::verify_slice`, which is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::AppError;

type HmacSha512 = Hmac<Sha512>;

/// Hex HMAC-SHA512 digest of `body` under `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a header-supplied signature against the raw request body.
/// Rejects when the secret is not configured, the header is not valid hex,
/// or the digests differ.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), AppError> {
    if secret.is_empty() {
        return Err(AppError::Internal(
            "gateway webhook secret is not configured".to_string(),
        ));
    }

    let claimed = hex::decode(signature_hex.trim()).map_err(|_| AppError::SignatureMismatch)?;

    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&claimed).map_err(|_| AppError::SignatureMismatch)
}
