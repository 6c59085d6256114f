use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use cowin::ApiError;
use serde::{Deserialize, Serialize};

/// Errors raised by the acquisition engine.
///
/// Only [`EngineError::CaptchaRequired`] and [`EngineError::Precondition`]
/// are fatal; everything else is survived by the loop's retry policy.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// OTP exchange failed; retried indefinitely with a fixed delay
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network, 5xx, or parse failure during scan or booking
    #[error("transient platform failure: {0}")]
    Transient(String),

    /// The platform demanded a captcha this engine cannot solve
    #[error("captcha challenge required by the platform")]
    CaptchaRequired,

    /// A targeted beneficiary already holds an active appointment
    #[error("{} active appointment(s) block this run", .0.len())]
    Precondition(Vec<ActiveAppointment>),

    /// The run cannot start with the supplied configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ApiError> for EngineError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::CaptchaRequired => EngineError::CaptchaRequired,
            // An in-flight 401 is repaired by the next iteration's validity check
            other => EngineError::Transient(other.to_string()),
        }
    }
}

/// Dose number a run books for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dose {
    /// First dose
    One,
    /// Second dose
    Two,
}

impl Dose {
    /// Dose number as the platform encodes it.
    pub fn as_number(self) -> u8 {
        match self {
            Dose::One => 1,
            Dose::Two => 2,
        }
    }
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dose {}", self.as_number())
    }
}

/// Vaccination progress of a beneficiary as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaccinationStatus {
    /// No dose received yet
    NotVaccinated,
    /// First dose received
    PartiallyVaccinated,
    /// Both doses received
    FullyVaccinated,
}

impl VaccinationStatus {
    /// Parse the platform's status string; unknown strings are treated as
    /// not vaccinated, the most conservative bucket for eligibility.
    pub fn from_platform(status: &str) -> Self {
        match status.trim() {
            "Partially Vaccinated" => VaccinationStatus::PartiallyVaccinated,
            "Fully Vaccinated" | "Vaccinated" => VaccinationStatus::FullyVaccinated,
            _ => VaccinationStatus::NotVaccinated,
        }
    }

    /// Appointments already expected on record for this status: a partially
    /// vaccinated beneficiary's first appointment is history, not a conflict.
    pub fn expected_appointments(self) -> usize {
        match self {
            VaccinationStatus::PartiallyVaccinated => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for VaccinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VaccinationStatus::NotVaccinated => "not vaccinated",
            VaccinationStatus::PartiallyVaccinated => "partially vaccinated",
            VaccinationStatus::FullyVaccinated => "fully vaccinated",
        };
        f.write_str(label)
    }
}

/// A beneficiary targeted by this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beneficiary {
    /// Opaque platform reference id
    pub reference_id: String,
    /// Display name
    pub name: String,
    /// Vaccination progress at profile-collection time
    pub status: VaccinationStatus,
}

impl Beneficiary {
    /// Whether this beneficiary may be booked for the given dose.
    pub fn eligible_for(&self, dose: Dose) -> bool {
        match self.status {
            VaccinationStatus::NotVaccinated => dose == Dose::One,
            VaccinationStatus::PartiallyVaccinated => dose == Dose::Two,
            VaccinationStatus::FullyVaccinated => false,
        }
    }
}

/// Dose a beneficiary set qualifies for: dose 2 only when every beneficiary
/// has already received a first dose.
pub fn dose_for(beneficiaries: &[Beneficiary]) -> Dose {
    let all_partial = beneficiaries
        .iter()
        .all(|b| b.status == VaccinationStatus::PartiallyVaccinated);
    if all_partial && !beneficiaries.is_empty() {
        Dose::Two
    } else {
        Dose::One
    }
}

/// A search location, ordered as the operator supplied them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Location {
    /// Six-digit postal pincode
    Pincode(String),
    /// District in the platform's location hierarchy
    District {
        /// Platform district id
        id: u32,
        /// District name for display
        name: String,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Pincode(pin) => write!(f, "pincode {}", pin),
            Location::District { name, .. } => write!(f, "district {}", name),
        }
    }
}

/// Vaccine preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaccineFilter {
    /// Accept any vaccine
    Any,
    /// Accept only the named vaccine
    Only(String),
}

impl VaccineFilter {
    /// Whether a session administering `vaccine` passes this filter.
    pub fn admits(&self, vaccine: &str) -> bool {
        match self {
            VaccineFilter::Any => true,
            VaccineFilter::Only(wanted) => wanted.eq_ignore_ascii_case(vaccine.trim()),
        }
    }
}

/// Fee preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeFilter {
    /// Accept free and paid centers alike
    Any,
    /// Free centers only
    Free,
    /// Paid centers only
    Paid,
}

impl FeeFilter {
    /// Whether a center with the given fee category passes this filter.
    pub fn admits(&self, fee_type: &str) -> bool {
        match self {
            FeeFilter::Any => true,
            FeeFilter::Free => fee_type.trim().eq_ignore_ascii_case("free"),
            FeeFilter::Paid => fee_type.trim().eq_ignore_ascii_case("paid"),
        }
    }
}

/// Search criteria for one run, immutable once the loop starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Locations to query, in priority order
    pub locations: Vec<Location>,
    /// Vaccine preference
    pub vaccine: VaccineFilter,
    /// Fee preference
    pub fee: FeeFilter,
    /// Smallest open capacity worth booking
    pub min_slots: u32,
    /// Earliest acceptable appointment date
    pub start_date: NaiveDate,
    /// Dose being booked
    pub dose: Dose,
    /// Sleep between empty scans, in seconds
    pub refresh_interval_secs: u64,
}

impl SearchCriteria {
    /// Sleep between empty scans.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// A bookable slot produced by one scan, discarded after the attempt.
#[derive(Debug, Clone)]
pub struct SlotCandidate {
    /// Platform id of the center
    pub center_id: u64,
    /// Center name for display
    pub center_name: String,
    /// Appointment date
    pub date: NaiveDate,
    /// Session to book into
    pub session_id: String,
    /// Time-window label within the session
    pub slot: String,
    /// Open capacity for the requested dose
    pub capacity: u32,
    /// Fee category of the center
    pub fee_type: String,
    /// Vaccine administered
    pub vaccine: String,
}

/// Verdict of one booking attempt.
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    /// The appointment was secured
    Booked {
        /// Platform confirmation number
        confirmation: String,
    },
    /// The slot was taken before the booking landed; expected under contention
    Conflict(String),
    /// The platform rejected the request as invalid
    Rejected(String),
    /// The platform demanded a captcha; terminal for this run
    CaptchaRequired,
    /// Network or server failure; retried after a fixed delay
    Transient(String),
}

/// An appointment that blocks booking, reported to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAppointment {
    /// Beneficiary holding the appointment
    pub beneficiary: String,
    /// Center name
    pub center: String,
    /// State the center is in
    pub state: String,
    /// Dose number of the appointment
    pub dose: u8,
    /// Appointment date as the platform formats it
    pub date: String,
    /// Time-window label
    pub slot: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beneficiary(status: VaccinationStatus) -> Beneficiary {
        Beneficiary {
            reference_id: "1".to_string(),
            name: "Test".to_string(),
            status,
        }
    }

    #[test]
    fn partially_vaccinated_is_dose_two_only() {
        let b = beneficiary(VaccinationStatus::PartiallyVaccinated);
        assert!(!b.eligible_for(Dose::One));
        assert!(b.eligible_for(Dose::Two));
    }

    #[test]
    fn not_vaccinated_is_dose_one_only() {
        let b = beneficiary(VaccinationStatus::NotVaccinated);
        assert!(b.eligible_for(Dose::One));
        assert!(!b.eligible_for(Dose::Two));
    }

    #[test]
    fn fully_vaccinated_is_never_eligible() {
        let b = beneficiary(VaccinationStatus::FullyVaccinated);
        assert!(!b.eligible_for(Dose::One));
        assert!(!b.eligible_for(Dose::Two));
    }

    #[test]
    fn dose_two_only_when_all_partially_vaccinated() {
        let all_partial = vec![
            beneficiary(VaccinationStatus::PartiallyVaccinated),
            beneficiary(VaccinationStatus::PartiallyVaccinated),
        ];
        assert_eq!(dose_for(&all_partial), Dose::Two);

        let mixed = vec![
            beneficiary(VaccinationStatus::PartiallyVaccinated),
            beneficiary(VaccinationStatus::NotVaccinated),
        ];
        assert_eq!(dose_for(&mixed), Dose::One);
    }

    #[test]
    fn fee_filter_matches_platform_strings() {
        assert!(FeeFilter::Free.admits("Free"));
        assert!(!FeeFilter::Free.admits("Paid"));
        assert!(FeeFilter::Paid.admits("Paid"));
        assert!(FeeFilter::Any.admits("Paid"));
        assert!(FeeFilter::Any.admits("Free"));
    }

    #[test]
    fn vaccine_filter_is_case_insensitive() {
        let only = VaccineFilter::Only("COVISHIELD".to_string());
        assert!(only.admits("Covishield"));
        assert!(!only.admits("COVAXIN"));
        assert!(VaccineFilter::Any.admits("COVAXIN"));
    }

    #[test]
    fn status_parse_covers_platform_strings() {
        assert_eq!(
            VaccinationStatus::from_platform("Partially Vaccinated"),
            VaccinationStatus::PartiallyVaccinated
        );
        assert_eq!(
            VaccinationStatus::from_platform("Fully Vaccinated"),
            VaccinationStatus::FullyVaccinated
        );
        assert_eq!(
            VaccinationStatus::from_platform("Not Vaccinated"),
            VaccinationStatus::NotVaccinated
        );
    }

    #[test]
    fn expected_appointments_by_status() {
        assert_eq!(VaccinationStatus::NotVaccinated.expected_appointments(), 0);
        assert_eq!(
            VaccinationStatus::PartiallyVaccinated.expected_appointments(),
            1
        );
        assert_eq!(VaccinationStatus::FullyVaccinated.expected_appointments(), 0);
    }
}
