//! Poll status state machine.
//!
//! ```text
//! idle ──→ syncing ──→ live | waiting | error
//!             ↑                  │
//!             └──── next cycle ──┘   (live stays live while refreshing)
//! ```
//!
//! [`next_status`] is the pure transition function; [`PollState`] applies it
//! together with the data that accompanies each outcome.

use super::feed::FeedError;
use super::resolver::FeedResult;
use crate::catalog::{Building, BuildingCatalog};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;

/// Displayed sensor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    /// Mounted, no cycle started yet
    Idle,
    /// A request is in flight and nothing is live
    Syncing,
    /// The feed indicates a building
    Live,
    /// The feed answered but indicates no building
    Waiting,
    /// The last request failed
    Error,
}

/// What happened during a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A new request is about to be issued
    CycleStarted,
    /// The response resolved to a building
    Resolved,
    /// The response resolved to nothing
    Unresolved,
    /// The request failed
    Failed,
    /// The request was cancelled or replaced by a newer one
    Superseded,
}

/// Status transition for one event.
pub fn next_status(previous: SensorStatus, event: PollEvent) -> SensorStatus {
    match event {
        PollEvent::CycleStarted if previous == SensorStatus::Live => SensorStatus::Live,
        PollEvent::CycleStarted => SensorStatus::Syncing,
        PollEvent::Resolved => SensorStatus::Live,
        PollEvent::Unresolved => SensorStatus::Waiting,
        PollEvent::Failed => SensorStatus::Error,
        PollEvent::Superseded => previous,
    }
}

/// Client-side view of the relay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollState {
    pub status: SensorStatus,
    pub active_building: Building,
    pub last_error: Option<String>,
    pub last_touched_at: Option<String>,
}

impl PollState {
    /// State at mount time: idle, showing the first catalog entry.
    pub fn new(catalog: &BuildingCatalog) -> Self {
        Self {
            status: SensorStatus::Idle,
            active_building: catalog.first(),
            last_error: None,
            last_touched_at: None,
        }
    }

    pub fn begin_cycle(&mut self) {
        self.status = next_status(self.status, PollEvent::CycleStarted);
    }

    /// Apply a successful response. `now` stamps readings without a server time.
    pub fn apply_success(&mut self, result: &FeedResult, now: DateTime<Utc>) {
        self.last_error = None;
        match &result.building {
            Some(building) => {
                self.status = next_status(self.status, PollEvent::Resolved);
                self.active_building = building.clone();
                self.last_touched_at = Some(
                    result
                        .touched_at
                        .clone()
                        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
            None => {
                self.status = next_status(self.status, PollEvent::Unresolved);
            }
        }
    }

    /// Apply a failed request. Cancellations leave the state untouched.
    pub fn apply_failure(&mut self, error: &FeedError) {
        if error.is_cancelled() {
            self.status = next_status(self.status, PollEvent::Superseded);
            return;
        }
        self.status = next_status(self.status, PollEvent::Failed);
        self.last_error = Some(error.to_string());
    }

    /// Primary status line.
    pub fn status_line(&self) -> String {
        match self.status {
            SensorStatus::Live => format!("Touch detected: {}", self.active_building.name),
            SensorStatus::Waiting => "Waiting for a sensor value".to_string(),
            SensorStatus::Syncing => "Connecting to sensor...".to_string(),
            SensorStatus::Idle => "Initializing sensor".to_string(),
            SensorStatus::Error => "Sensor connection error".to_string(),
        }
    }

    /// Secondary line: the error if any, otherwise the last update time.
    pub fn detail_line(&self) -> String {
        if let Some(error) = &self.last_error {
            return format!("Error: {error}");
        }
        match &self.last_touched_at {
            Some(at) => {
                let shown = DateTime::parse_from_rfc3339(at)
                    .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
                    .unwrap_or_else(|_| at.clone());
                format!("Last update: {shown}")
            }
            None => "No recent update".to_string(),
        }
    }
}
