use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::types::EngineError;

/// A session with less remaining lifetime than this is treated as expired,
/// leaving headroom for clock skew and request latency.
pub const MIN_REMAINING_SECS: i64 = 30;

/// Below this remaining lifetime the engine warns so refresh can be pre-emptive.
pub const WARN_REMAINING_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Bearer credential for the platform, replaced wholesale on refresh.
///
/// The expiry claim is read without signature verification: the signature is
/// the platform's trust boundary, not this client's, and the platform's key
/// is not available here.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a bearer token by decoding its expiry claim.
    pub fn from_token(token: String) -> Result<Self, EngineError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let data = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| EngineError::Auth(format!("token decode failed: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| EngineError::Auth("token carries an invalid expiry claim".to_string()))?;

        Ok(Self { token, expires_at })
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute expiry instant from the token's claim.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Seconds of lifetime left.
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    /// Whether the session still has enough lifetime to back a request.
    pub fn is_valid(&self) -> bool {
        self.remaining_secs() > MIN_REMAINING_SECS
    }

    /// Whether the session is close enough to expiry to warrant a warning.
    pub fn near_expiry(&self) -> bool {
        self.remaining_secs() <= WARN_REMAINING_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        exp: i64,
        sub: String,
    }

    fn token_expiring_in(secs: i64) -> String {
        let claims = TestClaims {
            exp: Utc::now().timestamp() + secs,
            sub: "user".to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"irrelevant"),
        )
        .unwrap()
    }

    #[test]
    fn session_with_ample_lifetime_is_valid() {
        let session = Session::from_token(token_expiring_in(120)).unwrap();
        assert!(session.is_valid());
        assert!(!session.near_expiry());
    }

    #[test]
    fn session_under_thirty_seconds_is_invalid() {
        let session = Session::from_token(token_expiring_in(25)).unwrap();
        assert!(!session.is_valid());
    }

    #[test]
    fn session_under_sixty_seconds_is_near_expiry_but_valid() {
        let session = Session::from_token(token_expiring_in(45)).unwrap();
        assert!(session.is_valid());
        assert!(session.near_expiry());
    }

    #[test]
    fn expired_token_still_decodes() {
        let session = Session::from_token(token_expiring_in(-10)).unwrap();
        assert!(!session.is_valid());
    }

    #[test]
    fn garbage_token_is_an_auth_error() {
        let result = Session::from_token("not-a-jwt".to_string());
        assert!(matches!(result, Err(EngineError::Auth(_))));
    }
}
