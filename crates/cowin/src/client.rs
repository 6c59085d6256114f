use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::*;

/// Application secret the platform expects on OTP issuance requests.
const DEFAULT_OTP_SECRET: &str =
    "U2FsdGVkX1+z/4Nr9nta+2DrVJSv7KS6VoQUSQ1ZXYDx/CJUkWxFYG6P3iM/VW+6";

/// Errors raised by the CoWIN client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request never reached the platform or the connection dropped
    #[error("network error: {0}")]
    Network(String),

    /// Platform throttled the caller
    #[error("rate limited by the platform")]
    RateLimited,

    /// Bearer token missing, expired, or revoked
    #[error("unauthorized: bearer token rejected")]
    Unauthorized,

    /// Platform demanded a captcha challenge
    #[error("captcha challenge required")]
    CaptchaRequired,

    /// The requested slot was taken before the booking landed
    #[error("slot no longer available: {0}")]
    SlotUnavailable(String),

    /// Platform rejected the request as invalid
    #[error("request rejected: {0}")]
    Validation(String),

    /// Server-side failure on the platform
    #[error("platform error: {0}")]
    Platform(String),

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Configuration for the CoWIN client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the public API
    pub base_url: String,

    /// Browser-like User-Agent; the platform rejects default client UAs
    pub user_agent: String,

    /// Origin/referer presented with every request
    pub origin: String,

    /// Secret sent alongside OTP issuance requests
    pub otp_secret: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cdn-api.co-vin.in/api".to_string(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36"
                .to_string(),
            origin: "https://selfregistration.cowin.gov.in/".to_string(),
            otp_secret: DEFAULT_OTP_SECRET.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the CoWIN self-registration API.
pub struct CowinClient {
    client: Client,
    config: ClientConfig,
}

impl CowinClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Request OTP delivery to the given mobile number.
    pub async fn generate_otp(&self, mobile: &str) -> Result<Uuid, ApiError> {
        let url = format!("{}/v2/auth/generateMobileOTP", self.config.base_url);
        let body = GenerateOtpRequest {
            mobile,
            secret: &self.config.otp_secret,
        };

        let response = self.decorate(self.client.post(&url)).json(&body).send().await;
        let challenge: OtpChallenge = self.parse(response).await?;

        debug!("OTP challenge issued, txn {}", challenge.txn_id);
        Ok(challenge.txn_id)
    }

    /// Confirm a delivered OTP. `otp_digest` is the SHA-256 hex digest of the code.
    pub async fn confirm_otp(&self, txn_id: Uuid, otp_digest: &str) -> Result<String, ApiError> {
        let url = format!("{}/v2/auth/validateMobileOTP", self.config.base_url);
        let body = ConfirmOtpRequest {
            otp: otp_digest,
            txn_id,
        };

        let response = self.decorate(self.client.post(&url)).json(&body).send().await;
        let issued: TokenResponse = self.parse(response).await?;

        Ok(issued.token)
    }

    /// Weekly slot calendar for a pincode, starting at `date`.
    pub async fn calendar_by_pin(
        &self,
        pincode: &str,
        date: NaiveDate,
        token: &str,
    ) -> Result<CalendarResponse, ApiError> {
        let url = format!(
            "{}/v2/appointment/sessions/calendarByPin",
            self.config.base_url
        );
        let response = self
            .decorate(self.client.get(&url))
            .bearer_auth(token)
            .query(&[
                ("pincode", pincode.to_string()),
                ("date", date.format(PLATFORM_DATE_FMT).to_string()),
            ])
            .send()
            .await;

        self.parse(response).await
    }

    /// Weekly slot calendar for a district, starting at `date`.
    pub async fn calendar_by_district(
        &self,
        district_id: u32,
        date: NaiveDate,
        token: &str,
    ) -> Result<CalendarResponse, ApiError> {
        let url = format!(
            "{}/v2/appointment/sessions/calendarByDistrict",
            self.config.base_url
        );
        let response = self
            .decorate(self.client.get(&url))
            .bearer_auth(token)
            .query(&[
                ("district_id", district_id.to_string()),
                ("date", date.format(PLATFORM_DATE_FMT).to_string()),
            ])
            .send()
            .await;

        self.parse(response).await
    }

    /// Beneficiaries registered under the authenticated account.
    pub async fn beneficiaries(&self, token: &str) -> Result<Vec<BeneficiaryRecord>, ApiError> {
        let url = format!("{}/v2/appointment/beneficiaries", self.config.base_url);
        let response = self
            .decorate(self.client.get(&url))
            .bearer_auth(token)
            .send()
            .await;

        let listing: BeneficiariesResponse = self.parse(response).await?;
        Ok(listing.beneficiaries)
    }

    /// Book an appointment. Returns the confirmation number.
    pub async fn schedule(
        &self,
        request: &ScheduleRequest<'_>,
        token: &str,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v2/appointment/schedule", self.config.base_url);
        let response = self
            .decorate(self.client.post(&url))
            .bearer_auth(token)
            .json(request)
            .send()
            .await;

        let confirmed: ScheduleResponse = self.parse(response).await?;
        Ok(confirmed.appointment_confirmation_no)
    }

    /// States in the platform's location hierarchy.
    pub async fn states(&self, token: &str) -> Result<Vec<StateRecord>, ApiError> {
        let url = format!("{}/v2/admin/location/states", self.config.base_url);
        let response = self
            .decorate(self.client.get(&url))
            .bearer_auth(token)
            .send()
            .await;

        let listing: StatesResponse = self.parse(response).await?;
        Ok(listing.states)
    }

    /// Districts of a state.
    pub async fn districts(
        &self,
        state_id: u32,
        token: &str,
    ) -> Result<Vec<DistrictRecord>, ApiError> {
        let url = format!(
            "{}/v2/admin/location/districts/{}",
            self.config.base_url, state_id
        );
        let response = self
            .decorate(self.client.get(&url))
            .bearer_auth(token)
            .send()
            .await;

        let listing: DistrictsResponse = self.parse(response).await?;
        Ok(listing.districts)
    }

    /// Attach the headers the platform gates on.
    fn decorate(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("origin", &self.config.origin)
            .header("referer", &self.config.origin)
    }

    /// Unwrap a response into the expected JSON shape or a classified error.
    async fn parse<T: serde::de::DeserializeOwned>(
        &self,
        response: Result<Response, reqwest::Error>,
    ) -> Result<T, ApiError> {
        let response =
            response.map_err(|e| ApiError::Network(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("platform replied {}: {}", status, body.trim());
            return Err(classify_failure(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("failed to parse response: {}", e)))
    }
}

/// Map a non-success platform reply to a typed error.
fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<PlatformErrorBody>(body)
        .ok()
        .and_then(|e| e.error)
        .unwrap_or_else(|| body.trim().to_string());

    // The captcha demand surfaces in the error body, not the status line
    if message.to_ascii_lowercase().contains("captcha") {
        return ApiError::CaptchaRequired;
    }

    match status.as_u16() {
        429 => ApiError::RateLimited,
        401 | 403 => ApiError::Unauthorized,
        409 => ApiError::SlotUnavailable(message),
        400..=499 => ApiError::Validation(message),
        _ => ApiError::Platform(format!("HTTP {}: {}", status, message)),
    }
}
