//! # OTP Services
//!
//! Retrieval ports for the one-time passcodes the platform sends during
//! authentication. The engine only sees the [`OtpSource`] trait; delivery may
//! be automated through a key-value relay or handled by a human at a prompt.

/// The OTP retrieval port and test doubles
mod source;
pub use source::*;

/// kvdb.io relay polling implementation
mod relay;
pub use relay::*;
