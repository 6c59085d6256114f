use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use cowin::{Center, CowinClient, PLATFORM_DATE_FMT};
use tracing::{debug, warn};

use crate::session::Session;
use crate::types::{Dose, EngineError, Location, SearchCriteria, SlotCandidate};

/// Queries the platform for open slots and filters them against the run's
/// search criteria.
pub struct AvailabilityScanner {
    client: Arc<CowinClient>,
    criteria: SearchCriteria,
}

impl AvailabilityScanner {
    /// Create a scanner over the given criteria.
    pub fn new(client: Arc<CowinClient>, criteria: SearchCriteria) -> Self {
        Self { client, criteria }
    }

    /// Query every configured location in order and return matching
    /// candidates.
    ///
    /// An empty result means nothing matched; errors are reserved for
    /// network/platform failures. Locations are queried sequentially to cap
    /// the request rate, and candidates keep location supply order, sorted by
    /// ascending date within each location.
    pub async fn scan(&self, session: &Session) -> Result<Vec<SlotCandidate>, EngineError> {
        // The platform returns a week of sessions starting at the query date
        let today = Utc::now().date_naive();
        let query_date = self.criteria.start_date.max(today);

        let mut candidates = Vec::new();
        for location in &self.criteria.locations {
            let calendar = match location {
                Location::Pincode(pin) => {
                    self.client
                        .calendar_by_pin(pin, query_date, session.token())
                        .await
                }
                Location::District { id, .. } => {
                    self.client
                        .calendar_by_district(*id, query_date, session.token())
                        .await
                }
            }
            .map_err(EngineError::from)?;

            let mut found = filter_centers(&self.criteria, &calendar.centers);
            found.sort_by(|a, b| a.date.cmp(&b.date));
            debug!("{} matching slot(s) at {}", found.len(), location);
            candidates.extend(found);
        }

        Ok(candidates)
    }
}

/// Retain the sessions that pass the run's date, fee, vaccine, and dose
/// capacity filters.
fn filter_centers(criteria: &SearchCriteria, centers: &[Center]) -> Vec<SlotCandidate> {
    let mut out = Vec::new();

    for center in centers {
        if !criteria.fee.admits(&center.fee_type) {
            continue;
        }

        for session in &center.sessions {
            let date = match NaiveDate::parse_from_str(&session.date, PLATFORM_DATE_FMT) {
                Ok(date) => date,
                Err(_) => {
                    warn!("unparseable session date from platform: {}", session.date);
                    continue;
                }
            };
            if date < criteria.start_date {
                continue;
            }
            if !criteria.vaccine.admits(&session.vaccine) {
                continue;
            }

            let capacity = match criteria.dose {
                Dose::One => session.available_capacity_dose1,
                Dose::Two => session.available_capacity_dose2,
            };
            if capacity == 0 {
                continue;
            }

            // A session without a time-window label cannot be booked
            let Some(slot) = session.slots.last() else {
                continue;
            };

            out.push(SlotCandidate {
                center_id: center.center_id,
                center_name: center.name.clone(),
                date,
                session_id: session.session_id.clone(),
                slot: slot.clone(),
                capacity,
                fee_type: center.fee_type.clone(),
                vaccine: session.vaccine.clone(),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeeFilter, VaccineFilter};
    use cowin::{ClientConfig, SessionInfo};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn criteria(locations: Vec<Location>) -> SearchCriteria {
        SearchCriteria {
            locations,
            vaccine: VaccineFilter::Any,
            fee: FeeFilter::Free,
            min_slots: 1,
            start_date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            dose: Dose::One,
            refresh_interval_secs: 15,
        }
    }

    fn session_info(id: &str, date: &str, dose1: u32) -> SessionInfo {
        SessionInfo {
            session_id: id.to_string(),
            date: date.to_string(),
            available_capacity: dose1,
            available_capacity_dose1: dose1,
            available_capacity_dose2: 0,
            min_age_limit: 18,
            vaccine: "COVISHIELD".to_string(),
            slots: vec!["09:00AM-11:00AM".to_string(), "11:00AM-01:00PM".to_string()],
        }
    }

    fn center(id: u64, fee: &str, sessions: Vec<SessionInfo>) -> Center {
        Center {
            center_id: id,
            name: format!("Center {}", id),
            district_name: None,
            pincode: None,
            fee_type: fee.to_string(),
            sessions,
        }
    }

    #[test]
    fn dates_before_minimum_are_dropped() {
        let criteria = criteria(vec![Location::Pincode("560001".to_string())]);
        let centers = vec![center(
            1,
            "Free",
            vec![
                session_info("s-early", "30-05-2021", 5),
                session_info("s-late", "02-06-2021", 5),
            ],
        )];

        let found = filter_centers(&criteria, &centers);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id, "s-late");
        assert_eq!(found[0].date, NaiveDate::from_ymd_opt(2021, 6, 2).unwrap());
    }

    #[test]
    fn excluded_fee_category_is_dropped() {
        let criteria = criteria(vec![Location::Pincode("560001".to_string())]);
        let centers = vec![
            center(1, "Paid", vec![session_info("s-paid", "02-06-2021", 5)]),
            center(2, "Free", vec![session_info("s-free", "02-06-2021", 5)]),
        ];

        let found = filter_centers(&criteria, &centers);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id, "s-free");
    }

    #[test]
    fn capacity_is_taken_for_the_requested_dose() {
        let mut criteria = criteria(vec![Location::Pincode("560001".to_string())]);
        criteria.dose = Dose::Two;

        // Open for dose 1 only; a dose-2 run must not see it
        let centers = vec![center(1, "Free", vec![session_info("s-1", "02-06-2021", 5)])];
        assert!(filter_centers(&criteria, &centers).is_empty());
    }

    #[test]
    fn vaccine_filter_applies() {
        let mut criteria = criteria(vec![Location::Pincode("560001".to_string())]);
        criteria.vaccine = VaccineFilter::Only("COVAXIN".to_string());

        let centers = vec![center(1, "Free", vec![session_info("s-1", "02-06-2021", 5)])];
        assert!(filter_centers(&criteria, &centers).is_empty());
    }

    #[tokio::test]
    async fn scan_preserves_location_supply_order() {
        let server = MockServer::start().await;

        // First pincode has the later date; it must still come first
        Mock::given(method("GET"))
            .and(path("/v2/appointment/sessions/calendarByPin"))
            .and(query_param("pincode", "560001"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"centers":[{"center_id":1,"name":"A","fee_type":"Free",
                    "sessions":[{"session_id":"a-1","date":"05-06-2021","available_capacity":4,
                    "available_capacity_dose1":4,"available_capacity_dose2":0,"min_age_limit":18,
                    "vaccine":"COVISHIELD","slots":["09:00AM-11:00AM"]}]}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/appointment/sessions/calendarByPin"))
            .and(query_param("pincode", "560002"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"centers":[{"center_id":2,"name":"B","fee_type":"Free",
                    "sessions":[{"session_id":"b-1","date":"02-06-2021","available_capacity":4,
                    "available_capacity_dose1":4,"available_capacity_dose2":0,"min_age_limit":18,
                    "vaccine":"COVISHIELD","slots":["09:00AM-11:00AM"]}]}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let config = ClientConfig {
            base_url: server.uri(),
            ..ClientConfig::default()
        };
        let client = Arc::new(CowinClient::new(config).unwrap());
        let scanner = AvailabilityScanner::new(
            client,
            criteria(vec![
                Location::Pincode("560001".to_string()),
                Location::Pincode("560002".to_string()),
            ]),
        );

        let session = test_session();
        let found = scanner.scan(&session).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|c| c.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "b-1"]);
    }

    #[tokio::test]
    async fn scan_surfaces_platform_failures_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/appointment/sessions/calendarByPin"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ClientConfig {
            base_url: server.uri(),
            ..ClientConfig::default()
        };
        let client = Arc::new(CowinClient::new(config).unwrap());
        let scanner = AvailabilityScanner::new(
            client,
            criteria(vec![Location::Pincode("560001".to_string())]),
        );

        let result = scanner.scan(&test_session()).await;
        assert!(matches!(result, Err(EngineError::Transient(_))));
    }

    fn test_session() -> Session {
        use jsonwebtoken::{EncodingKey, Header, encode};
        use serde::Serialize;

        #[derive(Serialize)]
        struct TestClaims {
            exp: i64,
        }

        let claims = TestClaims {
            exp: Utc::now().timestamp() + 900,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"irrelevant"),
        )
        .unwrap();
        Session::from_token(token).unwrap()
    }
}
