//! The relay service: sensor ingest and building query endpoints.
//!
//! # Architecture
//!
//! ```text
//! touch sensor ──→ ws://:6060 (ingest) ──→ mapper ──→ ReadingStore
//!                                                          │
//! browser / watch ←── GET http://:4000/api/building (query)┘
//! ```
//!
//! Both listeners run on the same runtime and share one [`RelayState`].

pub mod ingest;
pub mod query;

use crate::config::RelayConfig;
use crate::sensor::{
    create_shared_store, IngestStats, IngestStatsSnapshot, MappingError, SensorMapper,
    SensorReading, SharedIngestStats, SharedReadingStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// State shared by the ingest and query endpoints.
pub struct RelayState {
    /// Latest accepted reading
    store: SharedReadingStore,
    /// Sensor code mapping rules
    mapper: SensorMapper,
    /// Ingest counters
    stats: SharedIngestStats,
    /// Flips to `true` when the relay is shutting down
    shutdown: watch::Receiver<bool>,
}

impl RelayState {
    /// Create relay state with a fresh, empty store.
    pub fn new(mapper: SensorMapper, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store: create_shared_store(),
            mapper,
            stats: Arc::new(IngestStats::new()),
            shutdown,
        }
    }

    /// Map one raw sensor payload and record it if valid.
    ///
    /// Rejected payloads leave the stored reading untouched.
    pub fn ingest(&self, payload: &str) -> Result<SensorReading, MappingError> {
        match self.mapper.map_payload(payload) {
            Ok(mapped) => {
                let reading = self.store.update(mapped.building_id, mapped.sensor_code);
                self.stats.record_accepted();
                tracing::info!(
                    "sensorCode={} -> buildingId={}",
                    mapped.sensor_code,
                    mapped.building_id
                );
                Ok(reading)
            }
            Err(e) => {
                self.stats.record_rejected();
                tracing::warn!("Ignored invalid sensor value {:?}: {}", payload, e);
                Err(e)
            }
        }
    }

    pub fn store(&self) -> &SharedReadingStore {
        &self.store
    }

    pub fn stats(&self) -> &SharedIngestStats {
        &self.stats
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}

/// Handle to a running relay.
pub struct RelayHandle {
    ingest_addr: SocketAddr,
    query_addr: SocketAddr,
    state: Arc<RelayState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Bound address of the ingest WebSocket listener.
    pub fn ingest_addr(&self) -> SocketAddr {
        self.ingest_addr
    }

    /// Bound address of the query HTTP listener.
    pub fn query_addr(&self) -> SocketAddr {
        self.query_addr
    }

    /// Current reading, as the query endpoint would report it.
    pub fn snapshot(&self) -> SensorReading {
        self.state.store.snapshot()
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.state.stats.snapshot()
    }

    /// Stop both listeners, close open sensor connections and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Relay task failed: {}", e);
        }
        tracing::info!("Relay stopped ({})", self.state.stats.summary());
    }
}

pub(crate) async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = rx.wait_for(|stopping| *stopping).await;
}

/// Bind both listeners and serve them in the background.
pub async fn run(config: RelayConfig) -> anyhow::Result<RelayHandle> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(RelayState::new(config.mapper(), shutdown_rx.clone()));

    let ingest_listener = TcpListener::bind(config.ingest_bind()).await?;
    let ingest_addr = ingest_listener.local_addr()?;
    let query_listener = TcpListener::bind(config.query_bind()).await?;
    let query_addr = query_listener.local_addr()?;

    let ingest_app = ingest::router(Arc::clone(&state));
    let query_app = query::router(Arc::clone(&state), &config.cors_origin)?;

    tracing::info!("Ingest listening on ws://{}", ingest_addr);
    tracing::info!("Query API listening on http://{}", query_addr);

    let ingest_shutdown = shutdown_rx.clone();
    let query_shutdown = shutdown_rx;

    let task = tokio::spawn(async move {
        let ingest = axum::serve(
            ingest_listener,
            ingest_app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for_shutdown(ingest_shutdown));
        let query = axum::serve(query_listener, query_app)
            .with_graceful_shutdown(wait_for_shutdown(query_shutdown));

        let (ingest_result, query_result) = tokio::join!(ingest, query);
        if let Err(e) = ingest_result {
            tracing::error!("Ingest server error: {}", e);
        }
        if let Err(e) = query_result {
            tracing::error!("Query server error: {}", e);
        }
        tracing::info!("Relay shutdown signal received");
    });

    Ok(RelayHandle {
        ingest_addr,
        query_addr,
        state,
        shutdown_tx,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RelayState {
        let (_tx, rx) = watch::channel(false);
        RelayState::new(SensorMapper::default(), rx)
    }

    #[test]
    fn test_ingest_updates_store() {
        let state = state();
        let reading = state.ingest("4").unwrap();
        assert_eq!(reading.building_id, Some(4));
        assert_eq!(state.store().snapshot(), reading);
        assert_eq!(state.stats().snapshot().accepted, 1);
    }

    #[test]
    fn test_rejected_payload_keeps_previous_reading() {
        let state = state();
        let before = state.ingest("6").unwrap();

        assert!(state.ingest("999").is_err());
        assert!(state.ingest("abc").is_err());

        assert_eq!(state.store().snapshot(), before);
        let stats = state.stats().snapshot();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 2);
    }
}
