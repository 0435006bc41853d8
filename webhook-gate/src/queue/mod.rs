//! Queue module for handing verified events downstream.
//!
//! ## Architecture
//!
//! ```text
//! Platform → Web Server (signature gate) → payroll_webhooks queue → business handlers
//! ```

pub mod publisher;
pub mod types;

pub use publisher::Publisher;
pub use types::{event_type, VerifiedEvent};
