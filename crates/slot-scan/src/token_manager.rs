use std::sync::Arc;
use std::time::Duration;

use cowin::CowinClient;
use otp_services::OtpSource;
use sha2::{Digest, Sha256};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::session::Session;
use crate::types::EngineError;

/// Fixed delay between failed OTP exchanges.
pub const OTP_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Obtains and refreshes the bearer [`Session`] through the platform's OTP
/// challenge/response exchange.
pub struct TokenManager {
    client: Arc<CowinClient>,
    otp_source: Arc<dyn OtpSource>,
    mobile: String,
}

impl TokenManager {
    /// Create a manager for the given account.
    pub fn new(client: Arc<CowinClient>, otp_source: Arc<dyn OtpSource>, mobile: String) -> Self {
        Self {
            client,
            otp_source,
            mobile,
        }
    }

    /// Run the OTP exchange until a session is issued.
    ///
    /// OTP delivery is flaky by nature and a retry costs nothing, so failures
    /// are logged and retried on a fixed cadence without bound; the operator
    /// interrupt is the only way out.
    pub async fn acquire(&self) -> Session {
        loop {
            match self.try_acquire().await {
                Ok(session) => {
                    info!(
                        "session issued for {}, expires at {}",
                        mask_mobile(&self.mobile),
                        session.expires_at()
                    );
                    return session;
                }
                Err(e) => {
                    warn!(
                        "OTP exchange failed: {}; retrying in {}s",
                        e,
                        OTP_RETRY_DELAY.as_secs()
                    );
                    sleep(OTP_RETRY_DELAY).await;
                }
            }
        }
    }

    async fn try_acquire(&self) -> Result<Session, EngineError> {
        let txn_id = self
            .client
            .generate_otp(&self.mobile)
            .await
            .map_err(|e| EngineError::Auth(e.to_string()))?;
        info!("OTP requested for {}", mask_mobile(&self.mobile));

        let code = self
            .otp_source
            .fetch(&self.mobile)
            .await
            .map_err(|e| EngineError::Auth(e.to_string()))?;

        // The platform accepts the code only as its SHA-256 hex digest
        let digest = format!("{:x}", Sha256::digest(code.trim().as_bytes()));
        let token = self
            .client
            .confirm_otp(txn_id, &digest)
            .await
            .map_err(|e| EngineError::Auth(e.to_string()))?;

        Session::from_token(token)
    }
}

/// Keep only the trailing digits of a phone number in log output.
fn mask_mobile(mobile: &str) -> String {
    if mobile.len() > 4 {
        format!("{}{}", "*".repeat(mobile.len() - 4), &mobile[mobile.len() - 4..])
    } else {
        mobile.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use otp_services::StaticOtp;
    use serde::Serialize;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Serialize)]
    struct TestClaims {
        exp: i64,
    }

    fn fresh_token() -> String {
        let claims = TestClaims {
            exp: Utc::now().timestamp() + 900,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"irrelevant"),
        )
        .unwrap()
    }

    #[test]
    fn mask_keeps_last_four_digits() {
        assert_eq!(mask_mobile("9876543210"), "******3210");
        assert_eq!(mask_mobile("123"), "123");
    }

    #[tokio::test]
    async fn acquire_exchanges_otp_for_session() {
        let server = MockServer::start().await;
        let txn_id = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

        Mock::given(method("POST"))
            .and(path("/v2/auth/generateMobileOTP"))
            .and(body_partial_json(serde_json::json!({ "mobile": "9876543210" })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(r#"{{"txnId":"{}"}}"#, txn_id),
                "application/json",
            ))
            .mount(&server)
            .await;

        // The confirmation must carry the digest of the code, never the code
        let digest = format!("{:x}", Sha256::digest(b"443217"));
        Mock::given(method("POST"))
            .and(path("/v2/auth/validateMobileOTP"))
            .and(body_partial_json(serde_json::json!({
                "otp": digest,
                "txnId": txn_id,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                format!(r#"{{"token":"{}"}}"#, fresh_token()),
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = cowin::ClientConfig {
            base_url: server.uri(),
            ..cowin::ClientConfig::default()
        };
        let client = Arc::new(CowinClient::new(config).unwrap());
        let manager = TokenManager::new(
            client,
            Arc::new(StaticOtp("443217".to_string())),
            "9876543210".to_string(),
        );

        let session = manager.acquire().await;
        assert!(session.is_valid());
    }
}
