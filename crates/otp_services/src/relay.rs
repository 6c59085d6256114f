use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::source::{OtpError, OtpSource};

/// Configuration for the kvdb.io OTP relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the key-value store
    pub base_url: String,

    /// Private bucket the phone-side forwarder writes into
    pub bucket: String,

    /// Delay between polls (default: 5 seconds)
    pub poll_interval: Duration,

    /// Polls before giving up so the caller can re-request delivery (default: 15)
    pub max_polls: u32,

    /// Per-request timeout
    pub timeout: Duration,
}

impl RelayConfig {
    /// Relay configuration for a kvdb.io bucket with default cadence.
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Self {
            base_url: "https://kvdb.io".to_string(),
            bucket: bucket.into(),
            poll_interval: Duration::from_secs(5),
            max_polls: 15,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Automated OTP source polling a key-value bucket keyed by phone number.
///
/// A forwarder app on the user's phone writes each incoming SMS into the
/// bucket; this source polls the entry, skips the value consumed on the
/// previous exchange, and extracts the 6-digit code from the message text.
pub struct KvdbRelay {
    client: Client,
    config: RelayConfig,
    code_pattern: Regex,
    last_consumed: Mutex<Option<String>>,
}

impl KvdbRelay {
    /// Create a relay source for the configured bucket.
    pub fn new(config: RelayConfig) -> Result<Self, OtpError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OtpError::Relay(format!("failed to create relay client: {}", e)))?;

        // Platform SMS reads "Your OTP to register/access CoWIN is 123456 ..."
        let code_pattern = Regex::new(r"\b(\d{6})\b")
            .map_err(|e| OtpError::Relay(format!("invalid code pattern: {}", e)))?;

        Ok(Self {
            client,
            config,
            code_pattern,
            last_consumed: Mutex::new(None),
        })
    }

    /// Public URL the phone-side forwarder must be configured to write to.
    pub fn entry_url(&self, mobile: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url, self.config.bucket, mobile
        )
    }

    fn extract_code(&self, text: &str) -> Option<String> {
        self.code_pattern
            .captures(text)
            .map(|c| c[1].to_string())
    }
}

#[async_trait]
impl OtpSource for KvdbRelay {
    async fn fetch(&self, mobile: &str) -> Result<String, OtpError> {
        let url = self.entry_url(mobile);
        info!("waiting for OTP on relay bucket {}", self.config.bucket);

        for attempt in 1..=self.config.max_polls {
            // Give the phone-side forwarder time to land the message
            sleep(self.config.poll_interval).await;

            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("relay poll failed: {}", e);
                    continue;
                }
            };

            if !response.status().is_success() {
                debug!("relay replied {} (attempt {})", response.status(), attempt);
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| OtpError::Relay(format!("failed to read relay value: {}", e)))?;
            let text = text.trim();
            if text.is_empty() {
                debug!("relay empty (attempt {}/{})", attempt, self.config.max_polls);
                continue;
            }

            let mut last = self.last_consumed.lock().await;
            if last.as_deref() == Some(text) {
                debug!("relay still holds the previously consumed message");
                continue;
            }

            match self.extract_code(text) {
                Some(code) => {
                    *last = Some(text.to_string());
                    info!("OTP received from relay");
                    return Ok(code);
                }
                None => warn!("relay value carries no 6-digit code: {}", text),
            }
        }

        Err(OtpError::NotDelivered)
    }
}
