//! Building Relay - touch sensor to active-building relay.
//!
//! Touch sensors mounted on a campus map report which building was pressed.
//! The relay keeps the latest touch and serves it to kiosk pages, which poll
//! it and highlight the building.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────── relay ────────────────────────────────┐
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌───────────┐  │
//! │  │   Ingest    │──▶│   Mapper    │──▶│ ReadingStore │──▶│   Query   │  │
//! │  │ (ws :6060)  │   │ (code → id) │   │ (latest one) │   │(http:4000)│  │
//! │  └─────────────┘   └─────────────┘   └──────────────┘   └─────┬─────┘  │
//! └───────────────────────────────────────────────────────────────┼────────┘
//!                                                                 │ GET /api/building
//! ┌──────────────────────────────── client ───────────────────────▼────────┐
//! │        ┌────────────┐      ┌──────────────┐      ┌────────────┐        │
//! │        │ Poll loop  │─────▶│   Resolver   │─────▶│ PollState  │        │
//! │        │ (3s cycle) │      │ (fallbacks)  │      │ (status)   │        │
//! │        └────────────┘      └──────────────┘      └────────────┘        │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use building_relay::{client, BuildingCatalog, ClientConfig};
//!
//! # async fn demo() {
//! let config = ClientConfig::default();
//! let feed = client::HttpFeed::from_config(&config);
//! let handle = client::mount(feed, BuildingCatalog::default(), config.poll_interval);
//!
//! println!("{}", handle.state().status_line());
//! handle.unmount().await;
//! # }
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod sensor;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use catalog::{Building, BuildingCatalog};
pub use client::{PollHandle, PollState, SensorStatus};
pub use config::{ClientConfig, ConfigError, RelayConfig};
pub use sensor::{MappingError, ReadingStore, SensorMapper, SensorOverrides, SensorReading};

#[cfg(feature = "server")]
pub use server::{RelayHandle, RelayState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
