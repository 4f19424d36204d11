//! Server-side sensor handling.
//!
//! This module contains:
//! - The pure sensor code to building mapping
//! - The shared store holding the latest reading
//! - Ingest counters

pub mod mapping;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use mapping::{
    parse_sensor_code, MappedReading, MappingError, SensorMapper, SensorOverrides,
    DEFAULT_BUILDING_COUNT, DEFAULT_SENSOR_MAX,
};
pub use stats::{IngestStats, IngestStatsSnapshot, SharedIngestStats};
pub use store::{create_shared_store, ReadingStore, SensorReading, SharedReadingStore};
