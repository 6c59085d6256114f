//! # CoWIN Client
//!
//! Typed HTTP client for the CoWIN self-registration API. It covers the
//! endpoints the booking engine consumes: OTP issuance and confirmation,
//! calendar slot queries by pincode or district, beneficiary listing, and
//! appointment scheduling.

/// HTTP client and endpoint methods
mod client;
pub use client::*;

/// Wire types for CoWIN requests and responses
mod types;
pub use types::*;
