use std::io::{self, Write};

use cowin::BeneficiaryRecord;
use slot_scan::ActiveAppointment;

use crate::profile::Profile;

/// Render the account's beneficiaries as an aligned table.
pub fn beneficiaries_table(records: &[BeneficiaryRecord]) {
    println!(
        "{:<4} {:<24} {:<24} {:<12}",
        "#", "Name", "Status", "Vaccine"
    );
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:<24} {:<12}",
            index + 1,
            record.name,
            record.vaccination_status,
            record.vaccine.as_deref().unwrap_or("-")
        );
    }
}

/// Render blocking appointments for the operator to cancel manually.
pub fn appointments_table(appointments: &[ActiveAppointment]) {
    println!(
        "{:<20} {:<28} {:<16} {:<6} {:<12} {}",
        "Beneficiary", "Center", "State", "Dose", "Date", "Slot"
    );
    for appointment in appointments {
        println!(
            "{:<20} {:<28} {:<16} {:<6} {:<12} {}",
            appointment.beneficiary,
            appointment.center,
            appointment.state,
            appointment.dose,
            appointment.date,
            appointment.slot
        );
    }
}

/// Summarize a saved profile before asking the operator to reuse it.
pub fn profile_summary(profile: &Profile) {
    let locations: Vec<String> = profile
        .criteria
        .locations
        .iter()
        .map(ToString::to_string)
        .collect();

    println!("Saved search profile:");
    println!("  Locations:        {}", locations.join(", "));
    println!("  Dose:             {}", profile.criteria.dose);
    println!("  Earliest date:    {}", profile.criteria.start_date);
    println!("  Fee preference:   {:?}", profile.criteria.fee);
    println!("  Minimum slots:    {}", profile.criteria.min_slots);
    println!(
        "  Scan interval:    {}s",
        profile.criteria.refresh_interval_secs
    );
    println!("  Beneficiaries:");
    for beneficiary in &profile.beneficiaries {
        println!("    - {} ({})", beneficiary.name, beneficiary.status);
    }
}

/// Audible terminal cue.
pub fn beep(times: usize) {
    for _ in 0..times {
        print!("\x07");
    }
    let _ = io::stdout().flush();
}
