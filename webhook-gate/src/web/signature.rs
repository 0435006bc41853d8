//! Payroll platform webhook signature verification.
//!
//! The platform signs each delivery with HMAC-SHA256. The signed message is
//! the uppercase HTTP method immediately followed by the request body exactly
//! as it went over the wire, and the signature travels hex encoded in a
//! request header.
//!
//! The body must be the raw bytes. Parsing the JSON and serializing it again
//! changes whitespace, key order or number formatting and breaks the
//! signature.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::VerificationError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase hex signature the platform would send for `raw_body`.
pub fn sign(method: &str, raw_body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");

    mac.update(method.to_ascii_uppercase().as_bytes());
    mac.update(raw_body);

    hex::encode(mac.finalize().into_bytes())
}

/// Decide whether a webhook delivery is authentic.
///
/// # Arguments
///
/// * `raw_body` - The untouched request body bytes
/// * `claimed_signature` - Value of the signature header, if the request had one
/// * `secret` - The configured signing secret, if any
/// * `method` - HTTP method of the request; it is part of the signed message
///
/// # Returns
///
/// `Ok(())` when the claimed signature matches, otherwise the reason for
/// rejecting the delivery. A missing secret is reported before anything
/// about the request itself, so a misconfigured receiver always shows up as
/// [`VerificationError::SecretNotConfigured`].
pub fn verify(
    raw_body: &[u8],
    claimed_signature: Option<&str>,
    secret: Option<&str>,
    method: &str,
) -> Result<(), VerificationError> {
    let secret = match secret {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(VerificationError::SecretNotConfigured),
    };

    let claimed = match claimed_signature.map(str::trim) {
        Some(sig) if !sig.is_empty() => sig,
        _ => return Err(VerificationError::MissingSignature),
    };

    let expected = sign(method, raw_body, secret);

    if constant_time_compare(&expected, claimed) {
        Ok(())
    } else {
        debug!(
            expected_length = expected.len(),
            actual_length = claimed.len(),
            body_length = raw_body.len(),
            "webhook_signature_mismatch"
        );
        Err(VerificationError::SignatureMismatch)
    }
}

/// Constant-time comparison of a computed signature against a provided one.
///
/// The provided value is copied into a buffer as long as `expected` so the
/// byte comparison has the same cost whatever its length; the length check
/// is folded into the result instead of returning early.
fn constant_time_compare(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();

    let mut padded = vec![0u8; expected.len()];
    let n = provided.len().min(expected.len());
    padded[..n].copy_from_slice(&provided[..n]);

    let same_len = (provided.len() as u64).ct_eq(&(expected.len() as u64));
    let same_bytes = padded[..].ct_eq(expected);

    (same_len & same_bytes).into()
}
