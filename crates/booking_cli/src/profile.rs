use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use slot_scan::{Beneficiary, Location, SearchCriteria};
use validator::{Validate, ValidationError};

/// Operator-supplied run profile, persisted as JSON so a later run can skip
/// collection.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Profile {
    /// Search criteria driving the scan loop
    #[validate(custom(function = "validate_criteria"))]
    pub criteria: SearchCriteria,

    /// Beneficiaries targeted by the run
    #[validate(length(min = 1, message = "at least one beneficiary is required"))]
    pub beneficiaries: Vec<Beneficiary>,
}

/// Default profile location, keyed by mobile so accounts do not collide.
pub fn default_path(mobile: &str) -> PathBuf {
    PathBuf::from(format!("vaccine-booking-profile-{}.json", mobile))
}

/// Load and validate a previously saved profile.
pub fn load(path: &Path) -> Result<Profile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let profile: Profile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid profile", path.display()))?;
    profile
        .validate()
        .with_context(|| format!("{} fails validation", path.display()))?;
    Ok(profile)
}

/// Persist the profile for future runs.
pub fn save(path: &Path, profile: &Profile) -> Result<()> {
    let raw = serde_json::to_string_pretty(profile)?;
    fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// A registered mobile number is exactly 10 digits.
pub fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    if mobile.len() == 10 && mobile.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mobile"))
    }
}

/// A postal pincode is exactly 6 digits.
pub fn validate_pincode(pincode: &str) -> Result<(), ValidationError> {
    if pincode.len() == 6 && pincode.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_pincode"))
    }
}

/// Custom validation for the nested criteria value.
fn validate_criteria(criteria: &SearchCriteria) -> Result<(), ValidationError> {
    if criteria.locations.is_empty() {
        return Err(ValidationError::new("no_locations"));
    }
    if criteria.min_slots < 1 {
        return Err(ValidationError::new("min_slots_below_one"));
    }
    for location in &criteria.locations {
        if let Location::Pincode(pin) = location {
            validate_pincode(pin)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use slot_scan::{Dose, FeeFilter, VaccinationStatus, VaccineFilter};

    fn sample_profile() -> Profile {
        Profile {
            criteria: SearchCriteria {
                locations: vec![Location::Pincode("560001".to_string())],
                vaccine: VaccineFilter::Any,
                fee: FeeFilter::Free,
                min_slots: 1,
                start_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
                dose: Dose::One,
                refresh_interval_secs: 15,
            },
            beneficiaries: vec![Beneficiary {
                reference_id: "9876".to_string(),
                name: "Asha".to_string(),
                status: VaccinationStatus::NotVaccinated,
            }],
        }
    }

    #[test]
    fn profile_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        save(&path, &sample_profile()).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.beneficiaries.len(), 1);
        assert_eq!(loaded.beneficiaries[0].reference_id, "9876");
        assert_eq!(loaded.criteria.min_slots, 1);
    }

    #[test]
    fn profile_without_beneficiaries_fails_validation() {
        let mut profile = sample_profile();
        profile.beneficiaries.clear();
        assert!(profile.validate().is_err());
    }

    #[test]
    fn profile_with_bad_pincode_fails_validation() {
        let mut profile = sample_profile();
        profile.criteria.locations = vec![Location::Pincode("56".to_string())];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn mobile_must_be_ten_digits() {
        assert!(validate_mobile("9876543210").is_ok());
        assert!(validate_mobile("98765").is_err());
        assert!(validate_mobile("987654321x").is_err());
    }

    #[test]
    fn pincode_must_be_six_digits() {
        assert!(validate_pincode("560001").is_ok());
        assert!(validate_pincode("5600").is_err());
        assert!(validate_pincode("56000a").is_err());
    }
}
