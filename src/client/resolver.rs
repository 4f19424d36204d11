//! Resolve a building feed payload to a catalog entry.
//!
//! Resolution is a fallback chain; the first rule that yields a building
//! wins:
//!
//! 1. a literal `buildingName` present in the catalog
//! 2. `buildingId`, used as a direct index (`max(id, 0)`)
//! 3. `sensorCode`, offset by one (`max(code, 0) - 1`), so code 1 is the
//!    first building and code 0 resolves to nothing
//!
//! Rules 2 and 3 disagree on the offset. Deployed kiosks and relays depend on
//! exactly this behavior, so it stays until the sensor wiring is confirmed.

use crate::catalog::{Building, BuildingCatalog};
use crate::sensor::parse_sensor_code;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload of `GET /api/building` as seen by clients.
///
/// Fields are kept loosely typed: older relays send numbers as strings and
/// some send a literal `buildingName`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingFeedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_name: Option<Value>,
    #[serde(default)]
    pub building_id: Option<Value>,
    #[serde(default)]
    pub touched_at: Option<Value>,
    #[serde(default)]
    pub sensor_code: Option<Value>,
}

impl BuildingFeedResponse {
    /// Server timestamp, if it is a string.
    pub fn touched_at(&self) -> Option<&str> {
        self.touched_at.as_ref().and_then(Value::as_str)
    }

    /// Sensor code as an integer, if it parses.
    pub fn sensor_code(&self) -> Option<i64> {
        self.sensor_code.as_ref().and_then(parse_numeric)
    }
}

/// A payload together with the building it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResult {
    pub building: Option<Building>,
    pub touched_at: Option<String>,
    pub sensor_code: Option<i64>,
    pub raw: BuildingFeedResponse,
}

impl FeedResult {
    pub fn from_response(catalog: &BuildingCatalog, raw: BuildingFeedResponse) -> Self {
        Self {
            building: resolve_building(catalog, &raw),
            touched_at: raw.touched_at().map(str::to_string),
            sensor_code: raw.sensor_code(),
            raw,
        }
    }
}

/// Read an integer from a JSON number or from the first digit run of a string.
fn parse_numeric(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => parse_sensor_code(s.trim()),
        _ => None,
    }
}

fn by_name(catalog: &BuildingCatalog, value: &Value) -> Option<Building> {
    value.as_str().and_then(|name| catalog.find(name))
}

fn by_building_id(catalog: &BuildingCatalog, value: &Value) -> Option<Building> {
    let id = parse_numeric(value)?.max(0);
    usize::try_from(id).ok().and_then(|index| catalog.get(index))
}

fn by_sensor_code(catalog: &BuildingCatalog, value: &Value) -> Option<Building> {
    let index = parse_numeric(value)?.max(0) - 1;
    usize::try_from(index).ok().and_then(|index| catalog.get(index))
}

/// Apply the fallback chain. `None` means no building is currently indicated.
pub fn resolve_building(catalog: &BuildingCatalog, raw: &BuildingFeedResponse) -> Option<Building> {
    raw.building_name
        .as_ref()
        .and_then(|v| by_name(catalog, v))
        .or_else(|| raw.building_id.as_ref().and_then(|v| by_building_id(catalog, v)))
        .or_else(|| raw.sensor_code.as_ref().and_then(|v| by_sensor_code(catalog, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(payload: Value) -> Option<Building> {
        let catalog = BuildingCatalog::default();
        let raw: BuildingFeedResponse = serde_json::from_value(payload).unwrap();
        resolve_building(&catalog, &raw)
    }

    fn name(payload: Value) -> Option<String> {
        resolve(payload).map(|b| b.name)
    }

    #[test]
    fn test_building_id_is_direct_index() {
        assert_eq!(name(json!({ "buildingId": 3 })), Some("3호관".to_string()));
        assert_eq!(name(json!({ "buildingId": 0 })), Some("본관".to_string()));
        assert_eq!(name(json!({ "buildingId": -4 })), Some("본관".to_string()));
        assert_eq!(name(json!({ "buildingId": 11 })), Some("11호관".to_string()));
    }

    #[test]
    fn test_sensor_code_is_offset_by_one() {
        assert_eq!(name(json!({ "sensorCode": 1 })), Some("본관".to_string()));
        assert_eq!(name(json!({ "sensorCode": 4 })), Some("3호관".to_string()));
        assert_eq!(name(json!({ "sensorCode": 12 })), Some("11호관".to_string()));
        assert_eq!(name(json!({ "sensorCode": 0 })), None);
        assert_eq!(name(json!({ "sensorCode": 13 })), None);
    }

    #[test]
    fn test_rule_precedence() {
        // A literal name beats both numeric fields.
        assert_eq!(
            name(json!({ "buildingName": "9호관", "buildingId": 2, "sensorCode": 5 })),
            Some("9호관".to_string())
        );
        // buildingId beats sensorCode.
        assert_eq!(
            name(json!({ "buildingId": 2, "sensorCode": 5 })),
            Some("2호관".to_string())
        );
    }

    #[test]
    fn test_unresolved_rules_fall_through() {
        assert_eq!(
            name(json!({ "buildingName": "Library", "buildingId": 6 })),
            Some("6호관".to_string())
        );
        assert_eq!(
            name(json!({ "buildingId": 40, "sensorCode": 2 })),
            Some("1호관".to_string())
        );
        assert_eq!(name(json!({ "buildingName": 7 })), None);
    }

    #[test]
    fn test_initial_reading_resolves_to_nothing() {
        assert_eq!(
            resolve(json!({ "buildingId": null, "touchedAt": null, "sensorCode": null })),
            None
        );
        assert_eq!(resolve(json!({})), None);
    }

    #[test]
    fn test_string_encoded_numbers() {
        assert_eq!(name(json!({ "buildingId": " 5 " })), Some("5호관".to_string()));
        assert_eq!(name(json!({ "sensorCode": "code-2" })), None);
        assert_eq!(name(json!({ "sensorCode": "code 2" })), Some("1호관".to_string()));
        assert_eq!(name(json!({ "buildingId": "" })), None);
        assert_eq!(name(json!({ "buildingId": 2.5 })), None);
        assert_eq!(name(json!({ "buildingId": 2.0 })), Some("2호관".to_string()));
    }

    #[test]
    fn test_feed_result_carries_metadata() {
        let catalog = BuildingCatalog::default();
        let raw: BuildingFeedResponse = serde_json::from_value(json!({
            "buildingId": 4,
            "touchedAt": "2024-05-01T09:30:00.123Z",
            "sensorCode": 4
        }))
        .unwrap();

        let result = FeedResult::from_response(&catalog, raw);
        assert_eq!(result.building.unwrap().id, 4);
        assert_eq!(result.touched_at.as_deref(), Some("2024-05-01T09:30:00.123Z"));
        assert_eq!(result.sensor_code, Some(4));
    }
}
