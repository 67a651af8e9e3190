//! Response structures for the events API.
//!
//! Every field of the payload is required. Serde rejects a payload with a
//! missing field or a field of the wrong type, which is how the schema of the
//! upstream API is enforced.

use serde::Deserialize;

use crate::events::structs::{BossEvent, EventSnapshot, HelltideEvent, LegionEvent};

/// Representation of the `/api/events/recent` response.
#[derive(Deserialize, Debug)]
pub struct EventsResponse {
    pub boss: BossResponse,
    pub legion: LegionResponse,
    pub helltide: HelltideResponse,
}

/// World boss part of the response.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BossResponse {
    pub name: String,
    pub expected_name: String,
    pub next_expected_name: String,
    pub timestamp: i64,
    pub expected: i64,
    pub next_expected: i64,
    pub territory: String,
    pub zone: String,
}

/// Legion part of the response.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LegionResponse {
    pub timestamp: i64,
    pub expected: i64,
    pub next_expected: i64,
    pub territory: String,
    pub zone: String,
}

/// Helltide part of the response.
#[derive(Deserialize, Debug)]
pub struct HelltideResponse {
    pub timestamp: i64,
    pub zone: String,
    pub refresh: i64,
}

impl From<EventsResponse> for EventSnapshot {
    fn from(response: EventsResponse) -> Self {
        let EventsResponse {
            boss,
            legion,
            helltide,
        } = response;

        EventSnapshot {
            boss: BossEvent {
                name: boss.name,
                expected_name: boss.expected_name,
                next_expected_name: boss.next_expected_name,
                timestamp: boss.timestamp,
                expected: boss.expected,
                next_expected: boss.next_expected,
                territory: boss.territory,
                zone: boss.zone,
            },
            legion: LegionEvent {
                timestamp: legion.timestamp,
                expected: legion.expected,
                next_expected: legion.next_expected,
                territory: legion.territory,
                zone: legion.zone,
            },
            helltide: HelltideEvent {
                timestamp: helltide.timestamp,
                zone: helltide.zone,
                refresh: helltide.refresh,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BODY: &str = r#"{
        "boss": {"name": "Avarice", "expectedName": "Ashava", "nextExpectedName": "Wandering Death",
                 "timestamp": 1700000000, "expected": 1700020000, "nextExpected": 1700040000,
                 "territory": "Fractured Peaks", "zone": "Sarkova Pass"},
        "legion": {"timestamp": 1700000100, "expected": 1700001900, "nextExpected": 1700003700,
                   "territory": "Scosglen", "zone": "Deep Forest"},
        "helltide": {"timestamp": 1700000200, "zone": "hawe", "refresh": 1700003800}
    }"#;

    #[test]
    fn test_deserialize_and_convert() {
        let response: EventsResponse = serde_json::from_str(VALID_BODY).unwrap();
        let snapshot = EventSnapshot::from(response);

        assert_eq!(snapshot.boss.name, "Avarice");
        assert_eq!(snapshot.boss.expected_name, "Ashava");
        assert_eq!(snapshot.boss.next_expected, 1700040000);
        assert_eq!(snapshot.legion.expected, 1700001900);
        assert_eq!(snapshot.legion.territory, "Scosglen");
        assert_eq!(snapshot.helltide.zone, "hawe");
        assert_eq!(snapshot.helltide.refresh, 1700003800);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let body = VALID_BODY.replace(r#""nextExpected": 1700003700,"#, "");
        assert!(serde_json::from_str::<EventsResponse>(&body).is_err());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let body = VALID_BODY.replace(r#""timestamp": 1700000200"#, r#""timestamp": "soon""#);
        assert!(serde_json::from_str::<EventsResponse>(&body).is_err());
    }

    #[test]
    fn test_missing_event_is_rejected() {
        let body = r#"{"boss": {}, "legion": {}}"#;
        assert!(serde_json::from_str::<EventsResponse>(body).is_err());
    }
}
