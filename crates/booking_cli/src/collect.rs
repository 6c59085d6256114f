use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use cowin::{CowinClient, PLATFORM_DATE_FMT};
use dialoguer::{Input, MultiSelect, Select};
use slot_scan::{
    Beneficiary, FeeFilter, Location, SearchCriteria, Session, VaccinationStatus, VaccineFilter,
    dose_for,
};
use tracing::warn;
use validator::Validate;

use crate::display;
use crate::profile::{Profile, validate_pincode};

/// Interactively collect a run profile from the operator.
pub async fn collect_profile(client: &CowinClient, session: &Session) -> Result<Profile> {
    let records = client
        .beneficiaries(session.token())
        .await
        .context("failed to fetch beneficiaries")?;
    if records.is_empty() {
        bail!("no beneficiaries are registered under this account");
    }

    println!("Registered beneficiaries:");
    display::beneficiaries_table(&records);

    let labels: Vec<String> = records
        .iter()
        .map(|r| format!("{} ({})", r.name, r.vaccination_status))
        .collect();
    let picked = MultiSelect::new()
        .with_prompt("Select beneficiaries to book for (space toggles, enter confirms)")
        .items(&labels)
        .interact()?;
    if picked.is_empty() {
        bail!("at least one beneficiary must be selected");
    }

    let beneficiaries: Vec<Beneficiary> = picked
        .iter()
        .map(|&index| {
            let record = &records[index];
            Beneficiary {
                reference_id: record.reference_id.clone(),
                name: record.name.clone(),
                status: VaccinationStatus::from_platform(&record.vaccination_status),
            }
        })
        .collect();
    if beneficiaries
        .iter()
        .any(|b| b.status == VaccinationStatus::FullyVaccinated)
    {
        warn!("fully vaccinated beneficiaries are excluded from booking attempts");
    }

    let dose = dose_for(&beneficiaries);
    println!("This run will book {}.", dose);

    let locations = match Select::new()
        .with_prompt("Search for centers")
        .items(&["By pincode(s)", "By district"])
        .default(0)
        .interact()?
    {
        0 => collect_pincodes()?,
        _ => collect_district(client, session).await?,
    };

    let vaccine = match Select::new()
        .with_prompt("Vaccine preference")
        .items(&["Any", "COVISHIELD", "COVAXIN", "SPUTNIK V"])
        .default(0)
        .interact()?
    {
        0 => VaccineFilter::Any,
        1 => VaccineFilter::Only("COVISHIELD".to_string()),
        2 => VaccineFilter::Only("COVAXIN".to_string()),
        _ => VaccineFilter::Only("SPUTNIK V".to_string()),
    };

    let fee = match Select::new()
        .with_prompt("Fee preference")
        .items(&["Any", "Free", "Paid"])
        .default(0)
        .interact()?
    {
        0 => FeeFilter::Any,
        1 => FeeFilter::Free,
        _ => FeeFilter::Paid,
    };

    let min_slots: u32 = Input::new()
        .with_prompt("Minimum open slots worth booking")
        .default(1)
        .interact_text()?;

    let default_date = Utc::now().date_naive().format(PLATFORM_DATE_FMT).to_string();
    let raw_date: String = Input::new()
        .with_prompt("Earliest acceptable date (DD-MM-YYYY)")
        .default(default_date)
        .interact_text()?;
    let start_date = NaiveDate::parse_from_str(raw_date.trim(), PLATFORM_DATE_FMT)
        .context("date must be in DD-MM-YYYY form")?;

    let refresh_interval_secs: u64 = Input::new()
        .with_prompt("Seconds between scans when nothing is open")
        .default(15)
        .interact_text()?;

    let profile = Profile {
        criteria: SearchCriteria {
            locations,
            vaccine,
            fee,
            min_slots,
            start_date,
            dose,
            refresh_interval_secs,
        },
        beneficiaries,
    };
    profile
        .validate()
        .map_err(|e| anyhow!("collected profile is invalid: {}", e))?;

    Ok(profile)
}

fn collect_pincodes() -> Result<Vec<Location>> {
    let raw: String = Input::new()
        .with_prompt("Pincodes to search, comma separated, highest priority first")
        .interact_text()?;

    let mut locations = Vec::new();
    for pin in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        validate_pincode(pin).map_err(|_| anyhow!("'{}' is not a 6-digit pincode", pin))?;
        locations.push(Location::Pincode(pin.to_string()));
    }
    if locations.is_empty() {
        bail!("at least one pincode is required");
    }
    Ok(locations)
}

async fn collect_district(client: &CowinClient, session: &Session) -> Result<Vec<Location>> {
    let states = client
        .states(session.token())
        .await
        .context("failed to fetch states")?;
    let labels: Vec<&str> = states.iter().map(|s| s.state_name.as_str()).collect();
    let state = &states[Select::new()
        .with_prompt("State")
        .items(&labels)
        .interact()?];

    let districts = client
        .districts(state.state_id, session.token())
        .await
        .context("failed to fetch districts")?;
    let labels: Vec<&str> = districts.iter().map(|d| d.district_name.as_str()).collect();
    let district = &districts[Select::new()
        .with_prompt("District")
        .items(&labels)
        .interact()?];

    Ok(vec![Location::District {
        id: district.district_id,
        name: district.district_name.clone(),
    }])
}
