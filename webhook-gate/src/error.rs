//! Rejection reasons produced by the webhook signature gate.

use thiserror::Error;

/// Why an inbound webhook delivery was not trusted.
///
/// The `Display` strings are safe to return to callers: they never contain
/// the signing secret or any signature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The request carried no signature header (or an empty one).
    #[error("missing signature header")]
    MissingSignature,

    /// The receiver has no signing secret. Deployment fault, not an attack.
    #[error("signing secret not configured")]
    SecretNotConfigured,

    /// A signature was supplied but does not match the body.
    ///
    /// Forgery and in-transit corruption are deliberately not told apart.
    #[error("signature mismatch")]
    SignatureMismatch,
}

impl VerificationError {
    /// Whether the rejection points at our own configuration rather than the caller.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(self, VerificationError::SecretNotConfigured)
    }

    /// Short machine-readable label used in logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::MissingSignature => "missing_signature",
            VerificationError::SecretNotConfigured => "secret_not_configured",
            VerificationError::SignatureMismatch => "signature_mismatch",
        }
    }
}
