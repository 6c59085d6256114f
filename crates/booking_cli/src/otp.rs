use async_trait::async_trait;
use dialoguer::Input;
use otp_services::{OtpError, OtpSource};

/// Interactive OTP source: blocks on a terminal prompt until the operator
/// types in the code from their phone.
pub struct ManualOtp;

#[async_trait]
impl OtpSource for ManualOtp {
    async fn fetch(&self, mobile: &str) -> Result<String, OtpError> {
        let prompt = format!("Enter the OTP sent to {}", mobile);

        // dialoguer is synchronous; keep the runtime breathing while we wait
        let entered = tokio::task::spawn_blocking(move || {
            Input::<String>::new().with_prompt(prompt).interact_text()
        })
        .await
        .map_err(|e| OtpError::Input(format!("prompt task failed: {}", e)))?
        .map_err(|e| OtpError::Input(e.to_string()))?;

        Ok(entered.trim().to_string())
    }
}
