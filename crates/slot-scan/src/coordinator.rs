use std::sync::Arc;

use cowin::{ApiError, CowinClient, ScheduleRequest};
use tracing::{info, warn};

use crate::session::Session;
use crate::types::{Beneficiary, BookingOutcome, Dose, SlotCandidate};

/// Submits reservation requests and classifies the platform's verdict.
pub struct BookingCoordinator {
    client: Arc<CowinClient>,
}

impl BookingCoordinator {
    /// Create a coordinator over the platform client.
    pub fn new(client: Arc<CowinClient>) -> Self {
        Self { client }
    }

    /// Attempt to reserve `candidate` for every dose-eligible beneficiary.
    ///
    /// One atomic request to the platform; the caller decides what each
    /// outcome means for the loop.
    pub async fn attempt(
        &self,
        session: &Session,
        candidate: &SlotCandidate,
        beneficiaries: &[Beneficiary],
        dose: Dose,
    ) -> BookingOutcome {
        let ids: Vec<String> = beneficiaries
            .iter()
            .filter(|b| b.eligible_for(dose))
            .map(|b| b.reference_id.clone())
            .collect();
        if ids.is_empty() {
            return BookingOutcome::Rejected(format!(
                "no targeted beneficiary is eligible for {}",
                dose
            ));
        }

        info!(
            "booking {} beneficiary(ies) at {} on {} ({})",
            ids.len(),
            candidate.center_name,
            candidate.date,
            candidate.slot
        );

        let request = ScheduleRequest {
            dose: dose.as_number(),
            session_id: &candidate.session_id,
            slot: &candidate.slot,
            beneficiaries: &ids,
        };

        match self.client.schedule(&request, session.token()).await {
            Ok(confirmation) => BookingOutcome::Booked { confirmation },
            Err(ApiError::SlotUnavailable(reason)) => BookingOutcome::Conflict(reason),
            Err(ApiError::CaptchaRequired) => BookingOutcome::CaptchaRequired,
            Err(ApiError::Validation(reason)) => BookingOutcome::Rejected(reason),
            Err(other) => {
                warn!("booking request did not land: {}", other);
                BookingOutcome::Transient(other.to_string())
            }
        }
    }
}
