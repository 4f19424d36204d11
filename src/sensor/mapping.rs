//! Sensor code to building identifier mapping.
//!
//! Touch sensors report a small integer, usually as text and sometimes with
//! surrounding noise from the serial bridge (`"sensor:7\r\n"`). The first
//! optionally signed digit run is taken as the code. Codes outside
//! `[0, sensor_max]` are rejected; accepted codes are capped at the building
//! count so the stored identifier always addresses the catalog.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// Default upper bound for raw sensor codes.
pub const DEFAULT_SENSOR_MAX: i64 = 11;

/// Default cap for building identifiers.
pub const DEFAULT_BUILDING_COUNT: i64 = 11;

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").expect("static pattern is valid"))
}

/// Extract the first optionally signed digit run from a raw payload.
///
/// Returns `None` when the payload holds no digits. A digit run too large for
/// an `i64` saturates, which the range check then rejects.
pub fn parse_sensor_code(raw: &str) -> Option<i64> {
    let found = code_pattern().find(raw)?.as_str();
    match found.parse::<i64>() {
        Ok(code) => Some(code),
        Err(_) if found.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// Reasons a sensor payload is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The payload contained no digits
    NoCode(String),
    /// The code is outside the accepted sensor range
    OutOfRange { code: i64, max: i64 },
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingError::NoCode(raw) => write!(f, "no sensor code in payload {raw:?}"),
            MappingError::OutOfRange { code, max } => {
                write!(f, "sensor code {code} outside [0, {max}]")
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// A validated code together with the building it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedReading {
    pub sensor_code: i64,
    pub building_id: i64,
}

/// Optional per-code building overrides for non-sequential sensor wiring.
///
/// Empty by default, in which case mapping is the plain capped identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensorOverrides(BTreeMap<i64, i64>);

impl SensorOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// The wiring table of the first campus installation.
    ///
    /// Never applied unless explicitly configured.
    pub fn reference_wiring() -> Self {
        Self(BTreeMap::from([
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 4),
            (5, 1),
            (6, 5),
            (7, 10),
            (8, 11),
            (9, 7),
            (10, 6),
            (11, 7),
        ]))
    }

    /// Add or replace an override.
    pub fn insert(&mut self, sensor_code: i64, building_id: i64) {
        self.0.insert(sensor_code, building_id);
    }

    pub fn get(&self, sensor_code: i64) -> Option<i64> {
        self.0.get(&sensor_code).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for SensorOverrides {
    type Err = String;

    /// Parse `code=building` pairs separated by commas, e.g. `"5=1,6=5"`.
    ///
    /// The literal `reference` selects [`SensorOverrides::reference_wiring`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("reference") {
            return Ok(Self::reference_wiring());
        }

        let mut overrides = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (code, building) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected code=building, got '{pair}'"))?;
            let code: i64 = code
                .trim()
                .parse()
                .map_err(|e| format!("invalid sensor code '{}': {e}", code.trim()))?;
            let building: i64 = building
                .trim()
                .parse()
                .map_err(|e| format!("invalid building id '{}': {e}", building.trim()))?;
            if building < 0 {
                return Err(format!("building id must be non-negative, got {building}"));
            }
            overrides.insert(code, building);
        }
        Ok(overrides)
    }
}

/// Pure sensor code mapper.
#[derive(Debug, Clone)]
pub struct SensorMapper {
    sensor_max: i64,
    building_count: i64,
    overrides: SensorOverrides,
}

impl SensorMapper {
    /// Create a mapper. A building count below 1 is raised to 1.
    pub fn new(sensor_max: i64, building_count: i64) -> Self {
        Self {
            sensor_max,
            building_count: building_count.max(1),
            overrides: SensorOverrides::new(),
        }
    }

    /// Install an override table.
    pub fn with_overrides(mut self, overrides: SensorOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn sensor_max(&self) -> i64 {
        self.sensor_max
    }

    pub fn building_count(&self) -> i64 {
        self.building_count
    }

    /// Map an already numeric code.
    pub fn map_code(&self, code: i64) -> Result<MappedReading, MappingError> {
        if !(0..=self.sensor_max).contains(&code) {
            return Err(MappingError::OutOfRange {
                code,
                max: self.sensor_max,
            });
        }

        let target = self.overrides.get(code).unwrap_or(code);
        Ok(MappedReading {
            sensor_code: code,
            building_id: target.min(self.building_count),
        })
    }

    /// Extract a code from a raw text payload and map it.
    pub fn map_payload(&self, raw: &str) -> Result<MappedReading, MappingError> {
        let code = parse_sensor_code(raw).ok_or_else(|| MappingError::NoCode(raw.to_string()))?;
        self.map_code(code)
    }
}

impl Default for SensorMapper {
    fn default() -> Self {
        Self::new(DEFAULT_SENSOR_MAX, DEFAULT_BUILDING_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_in_range_are_capped() {
        let mapper = SensorMapper::default();
        for code in 0..=DEFAULT_BUILDING_COUNT {
            let mapped = mapper.map_code(code).unwrap();
            assert_eq!(mapped.sensor_code, code);
            assert_eq!(mapped.building_id, code.min(DEFAULT_BUILDING_COUNT));
        }

        let narrow = SensorMapper::new(11, 4);
        assert_eq!(narrow.map_code(9).unwrap().building_id, 4);
        assert_eq!(narrow.map_code(2).unwrap().building_id, 2);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mapper = SensorMapper::default();
        assert_eq!(
            mapper.map_code(12),
            Err(MappingError::OutOfRange { code: 12, max: 11 })
        );
        assert!(mapper.map_code(-1).is_err());
        assert!(mapper.map_payload("999").is_err());
        assert!(mapper.map_payload("-3").is_err());
    }

    #[test]
    fn test_payload_without_digits_rejected() {
        let mapper = SensorMapper::default();
        assert_eq!(
            mapper.map_payload("abc"),
            Err(MappingError::NoCode("abc".to_string()))
        );
        assert!(mapper.map_payload("").is_err());
    }

    #[test]
    fn test_first_digit_run_is_used() {
        assert_eq!(parse_sensor_code("sensor:7\r\n"), Some(7));
        assert_eq!(parse_sensor_code("4 then 9"), Some(4));
        assert_eq!(parse_sensor_code("x-2"), Some(-2));
        assert_eq!(parse_sensor_code("99999999999999999999999"), Some(i64::MAX));

        let mapper = SensorMapper::default();
        assert_eq!(mapper.map_payload("touch 05").unwrap().building_id, 5);
    }

    #[test]
    fn test_overrides_apply_before_cap() {
        let mut overrides = SensorOverrides::new();
        overrides.insert(5, 1);
        overrides.insert(6, 40);
        let mapper = SensorMapper::new(11, 11).with_overrides(overrides);

        assert_eq!(mapper.map_code(5).unwrap().building_id, 1);
        assert_eq!(mapper.map_code(6).unwrap().building_id, 11);
        assert_eq!(mapper.map_code(3).unwrap().building_id, 3);
        // Overrides never widen the accepted range.
        assert!(mapper.map_code(12).is_err());
    }

    #[test]
    fn test_override_parsing() {
        let parsed: SensorOverrides = "5=1, 6=5".parse().unwrap();
        assert_eq!(parsed.get(5), Some(1));
        assert_eq!(parsed.get(6), Some(5));
        assert_eq!(parsed.get(7), None);

        let reference: SensorOverrides = "reference".parse().unwrap();
        assert_eq!(reference, SensorOverrides::reference_wiring());

        assert!("".parse::<SensorOverrides>().unwrap().is_empty());
        assert!("5".parse::<SensorOverrides>().is_err());
        assert!("5=x".parse::<SensorOverrides>().is_err());
        assert!("5=-1".parse::<SensorOverrides>().is_err());
    }

    #[test]
    fn test_building_count_floor() {
        let mapper = SensorMapper::new(11, 0);
        assert_eq!(mapper.building_count(), 1);
        assert_eq!(mapper.map_code(0).unwrap().building_id, 0);
        assert_eq!(mapper.map_code(8).unwrap().building_id, 1);
    }
}
