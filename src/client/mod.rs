//! Client side of the relay.
//!
//! This module contains:
//! - Resolution of feed payloads to catalog buildings
//! - The poll status state machine
//! - Feed sources and the cancellable poll loop
//! - A WebSocket link for pushing sensor codes (with the `client` feature)

pub mod feed;
pub mod poller;
pub mod resolver;
pub mod status;

#[cfg(feature = "client")]
pub mod sensor_link;

// Re-export commonly used types
pub use feed::{FeedError, FeedSource};
pub use poller::{mount, PollHandle};
pub use resolver::{resolve_building, BuildingFeedResponse, FeedResult};
pub use status::{next_status, PollEvent, PollState, SensorStatus};

#[cfg(feature = "client")]
pub use feed::HttpFeed;

#[cfg(feature = "client")]
pub use sensor_link::{send_codes, SensorLink};
