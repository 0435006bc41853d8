//! Payroll webhook gate - signature-verifying webhook receiver.
//!
//! Every delivery from the payroll platform is checked against an
//! HMAC-SHA256 signature before its payload is trusted.
//!
//! ## Architecture
//!
//! ```text
//! Platform → Web Server → signature gate → payroll_webhooks queue → business handlers
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::{Config, SigningSecret};
pub use error::VerificationError;
pub use queue::{Publisher, VerifiedEvent};
pub use web::{router, sign, verify, AppState};
