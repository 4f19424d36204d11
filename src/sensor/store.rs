//! The shared "latest reading" record.
//!
//! Exactly one reading exists per process. Writers go through
//! [`ReadingStore::update`] and readers get a copy from
//! [`ReadingStore::snapshot`]; the lock is only held for the synchronous copy
//! in either direction, so readers never see a half-written reading.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// The most recent accepted touch.
///
/// All fields are `None` until the first valid sensor message arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub building_id: Option<i64>,
    #[serde(default, with = "millis_rfc3339")]
    pub touched_at: Option<DateTime<Utc>>,
    pub sensor_code: Option<i64>,
}

/// Process-wide owner of the latest [`SensorReading`].
#[derive(Debug, Default)]
pub struct ReadingStore {
    reading: RwLock<SensorReading>,
}

impl ReadingStore {
    /// Create a store holding the all-null initial reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the reading and stamp it with the current time.
    ///
    /// Stamps have millisecond precision and strictly increase, even when two
    /// updates land within the same millisecond.
    pub fn update(&self, building_id: i64, sensor_code: i64) -> SensorReading {
        let mut reading = self
            .reading
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = truncate_to_millis(Utc::now());
        let touched_at = match reading.touched_at {
            Some(previous) if now <= previous => previous + Duration::milliseconds(1),
            _ => now,
        };

        reading.building_id = Some(building_id);
        reading.sensor_code = Some(sensor_code);
        reading.touched_at = Some(touched_at);
        reading.clone()
    }

    /// Copy of the current reading.
    pub fn snapshot(&self) -> SensorReading {
        self.reading
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Thread-safe shared reading store.
pub type SharedReadingStore = Arc<ReadingStore>;

/// Create a new shared reading store.
pub fn create_shared_store() -> SharedReadingStore {
    Arc::new(ReadingStore::new())
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::milliseconds(1)).unwrap_or(at)
}

/// Serde support for optional timestamps as `2024-05-01T09:30:00.123Z`.
mod millis_rfc3339 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match at {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|at| at.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_reading_is_empty() {
        let store = ReadingStore::new();
        assert_eq!(store.snapshot(), SensorReading::default());

        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "buildingId": null, "touchedAt": null, "sensorCode": null })
        );
    }

    #[test]
    fn test_update_then_snapshot() {
        let store = ReadingStore::new();
        let written = store.update(3, 3);
        let read = store.snapshot();

        assert_eq!(read, written);
        assert_eq!(read.building_id, Some(3));
        assert_eq!(read.sensor_code, Some(3));
        assert!(read.touched_at.is_some());
    }

    #[test]
    fn test_touched_at_strictly_increases() {
        let store = ReadingStore::new();
        let mut previous = store.update(2, 2).touched_at.unwrap();
        for _ in 0..50 {
            let next = store.update(2, 2).touched_at.unwrap();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_wire_timestamp_format() {
        let store = ReadingStore::new();
        store.update(1, 1);
        let json = serde_json::to_value(store.snapshot()).unwrap();
        let touched = json["touchedAt"].as_str().unwrap();

        assert!(touched.ends_with('Z'));
        // yyyy-mm-ddThh:mm:ss.mmmZ
        assert_eq!(touched.len(), 24);

        let back: SensorReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, store.snapshot());
    }

    #[test]
    fn test_shared_store_across_threads() {
        let store = create_shared_store();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.update(i, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reading = store.snapshot();
        assert_eq!(reading.building_id, reading.sensor_code);
    }

    #[test]
    fn test_missing_fields_deserialize_as_empty() {
        let reading: SensorReading = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(reading, SensorReading::default());

        let reading: SensorReading =
            serde_json::from_value(serde_json::json!({ "buildingId": 4, "sensorCode": 4 }))
                .unwrap();
        assert_eq!(reading.building_id, Some(4));
        assert_eq!(reading.touched_at, None);
    }
}
