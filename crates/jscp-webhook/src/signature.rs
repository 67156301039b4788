//! HMAC-SHA256 webhook signatures (`X-Hub-Signature-256`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{WebhookError, WebhookResult};

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Scheme tag in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take any size key");
    mac.update(body);
    mac
}

/// Compute the signature header value for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let digest = mac(secret, body).finalize().into_bytes();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest))
}

/// Verify a signature header against `body`.
///
/// Only the canonical form (`sha256=` followed by 64 lowercase hex digits)
/// is accepted. The digest comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> WebhookResult<()> {
    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(WebhookError::MissingSignature)?;

    // Signature format: "sha256=<hex>"
    let sig_hex = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(WebhookError::InvalidSignature)?;

    let canonical = sig_hex.len() == 64
        && sig_hex
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !canonical {
        return Err(WebhookError::InvalidSignature);
    }

    let sig_bytes = hex::decode(sig_hex).map_err(|_| WebhookError::InvalidSignature)?;
    mac(secret, body)
        .verify_slice(&sig_bytes)
        .map_err(|_| WebhookError::InvalidSignature)
}
