use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Date format used by the platform in query parameters and session payloads.
pub const PLATFORM_DATE_FMT: &str = "%d-%m-%Y";

/// Response to an OTP issuance request.
#[derive(Debug, Deserialize)]
pub struct OtpChallenge {
    /// Transaction id to present when confirming the OTP
    #[serde(rename = "txnId")]
    pub txn_id: Uuid,
}

/// Request body for OTP issuance.
#[derive(Debug, Serialize)]
pub struct GenerateOtpRequest<'a> {
    /// Registered mobile number
    pub mobile: &'a str,
    /// Static application secret the platform expects alongside the number
    pub secret: &'a str,
}

/// Request body for OTP confirmation.
#[derive(Debug, Serialize)]
pub struct ConfirmOtpRequest<'a> {
    /// SHA-256 hex digest of the code the user received
    pub otp: &'a str,
    /// Transaction id returned by the issuance call
    #[serde(rename = "txnId")]
    pub txn_id: Uuid,
}

/// Response to a successful OTP confirmation.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for subsequent authenticated requests
    pub token: String,
}

/// Calendar response for a location query.
#[derive(Debug, Deserialize)]
pub struct CalendarResponse {
    /// Vaccination centers with open sessions in the queried week
    pub centers: Vec<Center>,
}

/// A vaccination center as reported by the calendar endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Center {
    /// Platform id of the center
    pub center_id: u64,
    /// Display name of the center
    pub name: String,
    /// District the center belongs to
    #[serde(default)]
    pub district_name: Option<String>,
    /// Pincode of the center
    #[serde(default)]
    pub pincode: Option<u32>,
    /// Fee category, `"Free"` or `"Paid"`
    pub fee_type: String,
    /// Bookable sessions at this center
    pub sessions: Vec<SessionInfo>,
}

/// One bookable (date, vaccine) session at a center.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    /// Platform id of the session, required for scheduling
    pub session_id: String,
    /// Session date in platform format (`DD-MM-YYYY`)
    pub date: String,
    /// Total open capacity across doses
    pub available_capacity: u32,
    /// Open capacity for dose 1
    #[serde(default)]
    pub available_capacity_dose1: u32,
    /// Open capacity for dose 2
    #[serde(default)]
    pub available_capacity_dose2: u32,
    /// Minimum eligible age
    pub min_age_limit: u32,
    /// Vaccine administered in this session
    pub vaccine: String,
    /// Time-window labels accepted by the scheduling endpoint
    pub slots: Vec<String>,
}

/// Response to the beneficiary listing endpoint.
#[derive(Debug, Deserialize)]
pub struct BeneficiariesResponse {
    /// Beneficiaries registered under the authenticated account
    pub beneficiaries: Vec<BeneficiaryRecord>,
}

/// A beneficiary as reported by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct BeneficiaryRecord {
    /// Opaque reference id used in booking requests
    #[serde(rename = "beneficiary_reference_id")]
    pub reference_id: String,
    /// Beneficiary name
    pub name: String,
    /// Vaccination status string, e.g. `"Partially Vaccinated"`
    pub vaccination_status: String,
    /// Vaccine received so far, if any
    #[serde(default)]
    pub vaccine: Option<String>,
    /// Appointments currently on record
    #[serde(default)]
    pub appointments: Vec<AppointmentRecord>,
}

/// An appointment already on record for a beneficiary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRecord {
    /// Platform id of the appointment
    #[serde(default)]
    pub appointment_id: Option<String>,
    /// Center name
    pub name: String,
    /// State the center is in
    #[serde(default)]
    pub state_name: String,
    /// Dose number the appointment is for
    pub dose: u8,
    /// Appointment date in platform format
    pub date: String,
    /// Time-window label
    pub slot: String,
}

/// Request body for the scheduling endpoint.
#[derive(Debug, Serialize)]
pub struct ScheduleRequest<'a> {
    /// Dose number being booked
    pub dose: u8,
    /// Session to book into
    pub session_id: &'a str,
    /// Time-window label within the session
    pub slot: &'a str,
    /// Reference ids of the beneficiaries to book
    pub beneficiaries: &'a [String],
}

/// Response to a successful scheduling request.
#[derive(Debug, Deserialize)]
pub struct ScheduleResponse {
    /// Confirmation number for the booked appointment
    pub appointment_confirmation_no: String,
}

/// Error body the platform attaches to rejected requests.
#[derive(Debug, Deserialize)]
pub struct PlatformErrorBody {
    /// Machine-readable error code
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
    /// Human-readable error message
    #[serde(default)]
    pub error: Option<String>,
}

/// A state in the platform's location hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct StateRecord {
    /// Platform id of the state
    pub state_id: u32,
    /// State name
    pub state_name: String,
}

/// Response to the state listing endpoint.
#[derive(Debug, Deserialize)]
pub struct StatesResponse {
    /// All states known to the platform
    pub states: Vec<StateRecord>,
}

/// A district within a state.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictRecord {
    /// Platform id of the district
    pub district_id: u32,
    /// District name
    pub district_name: String,
}

/// Response to the district listing endpoint.
#[derive(Debug, Deserialize)]
pub struct DistrictsResponse {
    /// Districts of the queried state
    pub districts: Vec<DistrictRecord>,
}
