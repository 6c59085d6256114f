use std::collections::HashSet;
use std::sync::Arc;

use cowin::CowinClient;
use tracing::{info, warn};

use crate::session::Session;
use crate::types::{ActiveAppointment, Beneficiary, EngineError, VaccinationStatus};

/// Result of the pre-run appointment check.
#[derive(Debug)]
pub enum PreflightOutcome {
    /// No targeted beneficiary holds an unexpected active appointment
    Clear,
    /// The listing could not be fetched; booking proceeds unverified
    Unverified(String),
}

/// One-time guard that refuses to book over an existing appointment.
pub struct PreflightGuard {
    client: Arc<CowinClient>,
}

impl PreflightGuard {
    /// Create a guard over the platform client.
    pub fn new(client: Arc<CowinClient>) -> Self {
        Self { client }
    }

    /// Compare each targeted beneficiary's appointment count against what
    /// their vaccination status expects; any excess appointment is an active
    /// conflict the operator must cancel manually before re-running.
    ///
    /// A failed fetch does not block the run, but the caller must warn the
    /// operator that duplicate bookings cannot be ruled out.
    pub async fn check(
        &self,
        session: &Session,
        targets: &[Beneficiary],
    ) -> Result<PreflightOutcome, EngineError> {
        let records = match self.client.beneficiaries(session.token()).await {
            Ok(records) => records,
            Err(e) => {
                warn!("could not verify existing appointments: {}", e);
                return Ok(PreflightOutcome::Unverified(e.to_string()));
            }
        };

        let targeted: HashSet<&str> = targets.iter().map(|b| b.reference_id.as_str()).collect();
        let mut active = Vec::new();

        for record in records
            .iter()
            .filter(|r| targeted.contains(r.reference_id.as_str()))
        {
            let status = VaccinationStatus::from_platform(&record.vaccination_status);
            let expected = status.expected_appointments();

            for appointment in record.appointments.iter().skip(expected) {
                active.push(ActiveAppointment {
                    beneficiary: record.name.clone(),
                    center: appointment.name.clone(),
                    state: appointment.state_name.clone(),
                    dose: appointment.dose,
                    date: appointment.date.clone(),
                    slot: appointment.slot.clone(),
                });
            }
        }

        if active.is_empty() {
            info!("preflight clear: no active appointments among targets");
            Ok(PreflightOutcome::Clear)
        } else {
            Err(EngineError::Precondition(active))
        }
    }
}
