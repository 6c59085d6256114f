use std::sync::Arc;
use std::time::Duration;

use cowin::CowinClient;
use otp_services::OtpSource;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::coordinator::BookingCoordinator;
use crate::scanner::AvailabilityScanner;
use crate::session::Session;
use crate::token_manager::TokenManager;
use crate::types::{Beneficiary, BookingOutcome, EngineError, SearchCriteria, SlotCandidate};

/// Fixed backoff after transient scan or booking failures.
pub const TRANSIENT_BACKOFF: Duration = Duration::from_secs(5);

/// Delay before the next scan after a non-terminal booking outcome.
///
/// A conflict means the platform's state just changed, so fresher results are
/// likely elsewhere and the re-scan is immediate; everything else retryable
/// takes the fixed backoff. `None` marks a terminal outcome.
pub fn retry_delay(outcome: &BookingOutcome) -> Option<Duration> {
    match outcome {
        BookingOutcome::Conflict(_) => Some(Duration::ZERO),
        BookingOutcome::Transient(_) | BookingOutcome::Rejected(_) => Some(TRANSIENT_BACKOFF),
        BookingOutcome::Booked { .. } | BookingOutcome::CaptchaRequired => None,
    }
}

/// First candidate carrying enough open capacity, in scan order.
pub fn pick_candidate(candidates: &[SlotCandidate], min_slots: u32) -> Option<&SlotCandidate> {
    candidates.iter().find(|c| c.capacity >= min_slots)
}

/// The top-level acquisition driver.
///
/// Owns the session, alternates scanning and booking, re-authenticates on
/// expiry, and runs until an appointment is secured, the platform demands a
/// captcha, or the operator interrupts the process. One network call is in
/// flight at any time; the single-flight guarantee is structural.
pub struct AcquisitionEngine {
    tokens: TokenManager,
    scanner: AvailabilityScanner,
    coordinator: BookingCoordinator,
    criteria: SearchCriteria,
    beneficiaries: Vec<Beneficiary>,
}

impl AcquisitionEngine {
    /// Assemble an engine for one run.
    pub fn new(
        client: Arc<CowinClient>,
        otp_source: Arc<dyn OtpSource>,
        mobile: String,
        criteria: SearchCriteria,
        beneficiaries: Vec<Beneficiary>,
    ) -> Result<Self, EngineError> {
        if beneficiaries.is_empty() {
            return Err(EngineError::Config(
                "at least one beneficiary is required".to_string(),
            ));
        }
        if criteria.locations.is_empty() {
            return Err(EngineError::Config(
                "at least one search location is required".to_string(),
            ));
        }

        Ok(Self {
            tokens: TokenManager::new(client.clone(), otp_source, mobile),
            scanner: AvailabilityScanner::new(client.clone(), criteria.clone()),
            coordinator: BookingCoordinator::new(client),
            criteria,
            beneficiaries,
        })
    }

    /// Drive the scan/book cycle until a slot is secured or a fatal
    /// condition surfaces. Returns the platform confirmation number.
    pub async fn run(&self, initial: Option<Session>) -> Result<String, EngineError> {
        let mut session = match initial {
            Some(session) if session.is_valid() => session,
            _ => self.tokens.acquire().await,
        };
        let mut expiry_warned = false;

        loop {
            // Session health gates every iteration; a refresh never ends the run
            if !session.is_valid() {
                info!("session expired; re-authenticating");
                session = self.tokens.acquire().await;
                expiry_warned = false;
            } else if session.near_expiry() && !expiry_warned {
                warn!(
                    "session expires in {}s; next refresh is imminent",
                    session.remaining_secs()
                );
                expiry_warned = true;
            }

            let candidates = match self.scanner.scan(&session).await {
                Ok(candidates) => candidates,
                Err(EngineError::CaptchaRequired) => {
                    error!("platform demanded a captcha during scan");
                    return Err(EngineError::CaptchaRequired);
                }
                Err(e) => {
                    warn!(
                        "scan failed: {}; retrying in {}s",
                        e,
                        TRANSIENT_BACKOFF.as_secs()
                    );
                    sleep(TRANSIENT_BACKOFF).await;
                    continue;
                }
            };

            let Some(candidate) = pick_candidate(&candidates, self.criteria.min_slots) else {
                debug!(
                    "no candidate with {}+ open slots among {}; next scan in {}s",
                    self.criteria.min_slots,
                    candidates.len(),
                    self.criteria.refresh_interval_secs
                );
                sleep(self.criteria.refresh_interval()).await;
                continue;
            };

            info!(
                "selected {} on {} ({} open, {})",
                candidate.center_name, candidate.date, candidate.capacity, candidate.fee_type
            );

            let outcome = self
                .coordinator
                .attempt(&session, candidate, &self.beneficiaries, self.criteria.dose)
                .await;

            match &outcome {
                BookingOutcome::Booked { confirmation } => {
                    info!("appointment secured, confirmation {}", confirmation);
                    return Ok(confirmation.clone());
                }
                BookingOutcome::CaptchaRequired => {
                    error!("platform demanded a captcha; this engine cannot solve it");
                    return Err(EngineError::CaptchaRequired);
                }
                BookingOutcome::Conflict(reason) => {
                    info!("slot contention: {}; re-scanning immediately", reason);
                }
                BookingOutcome::Rejected(reason) => {
                    warn!("booking rejected: {}", reason);
                }
                BookingOutcome::Transient(cause) => {
                    warn!("booking attempt failed: {}", cause);
                }
            }

            if let Some(delay) = retry_delay(&outcome) {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candidate(capacity: u32) -> SlotCandidate {
        SlotCandidate {
            center_id: 1,
            center_name: "Center".to_string(),
            date: NaiveDate::from_ymd_opt(2021, 6, 2).unwrap(),
            session_id: "s-1".to_string(),
            slot: "09:00AM-11:00AM".to_string(),
            capacity,
            fee_type: "Free".to_string(),
            vaccine: "COVISHIELD".to_string(),
        }
    }

    #[test]
    fn conflict_rescans_without_backoff() {
        let delay = retry_delay(&BookingOutcome::Conflict("slot taken".to_string()));
        assert_eq!(delay, Some(Duration::ZERO));
    }

    #[test]
    fn transient_and_rejected_take_the_fixed_backoff() {
        assert_eq!(
            retry_delay(&BookingOutcome::Transient("503".to_string())),
            Some(TRANSIENT_BACKOFF)
        );
        assert_eq!(
            retry_delay(&BookingOutcome::Rejected("bad dose".to_string())),
            Some(TRANSIENT_BACKOFF)
        );
    }

    #[test]
    fn booked_and_captcha_are_terminal() {
        assert_eq!(
            retry_delay(&BookingOutcome::Booked {
                confirmation: "OK".to_string()
            }),
            None
        );
        assert_eq!(retry_delay(&BookingOutcome::CaptchaRequired), None);
    }

    #[test]
    fn pick_candidate_honors_minimum_capacity() {
        let candidates = vec![candidate(1), candidate(4), candidate(9)];
        let picked = pick_candidate(&candidates, 3).unwrap();
        assert_eq!(picked.capacity, 4);
    }

    #[test]
    fn pick_candidate_takes_the_first_qualifying_slot() {
        let candidates = vec![candidate(5), candidate(9)];
        let picked = pick_candidate(&candidates, 1).unwrap();
        assert_eq!(picked.capacity, 5);
    }

    #[test]
    fn pick_candidate_with_no_qualifier_is_none() {
        let candidates = vec![candidate(1), candidate(2)];
        assert!(pick_candidate(&candidates, 3).is_none());
    }
}
