use async_trait::async_trait;

/// Errors raised while retrieving an OTP.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// Relay request failed
    #[error("relay error: {0}")]
    Relay(String),

    /// No code appeared within the polling window
    #[error("no OTP delivered within the polling window")]
    NotDelivered,

    /// Interactive entry failed or was cancelled
    #[error("input error: {0}")]
    Input(String),
}

/// A source of one-time passcodes for a phone number.
///
/// Implementations block until a code is available or the source gives up;
/// the caller decides whether to re-request OTP delivery and try again.
#[async_trait]
pub trait OtpSource: Send + Sync {
    /// Obtain the current OTP for `mobile`.
    async fn fetch(&self, mobile: &str) -> Result<String, OtpError>;
}

/// Fixed-code source for tests.
pub struct StaticOtp(pub String);

#[async_trait]
impl OtpSource for StaticOtp {
    async fn fetch(&self, _mobile: &str) -> Result<String, OtpError> {
        Ok(self.0.clone())
    }
}
