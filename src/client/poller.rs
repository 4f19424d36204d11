//! Recurring, cancellable building feed poll loop.
//!
//! [`mount`] starts a task that polls a [`FeedSource`] immediately and then
//! on a fixed interval. Each cycle supersedes the previous one: the earlier
//! request's token is cancelled before the new request is issued, and a
//! response is applied only if its cycle is still the current one. The
//! returned [`PollHandle`] exposes the state and tears everything down on
//! [`PollHandle::unmount`] (or drop).

use super::feed::{FeedError, FeedSource};
use super::resolver::{BuildingFeedResponse, FeedResult};
use super::status::PollState;
use crate::catalog::BuildingCatalog;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Shortest delay between poll cycles.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// The cycle whose response is allowed to update the state.
#[derive(Debug, Default)]
struct CurrentCycle {
    generation: u64,
    token: Option<CancellationToken>,
}

struct Shared {
    catalog: BuildingCatalog,
    state: watch::Sender<PollState>,
    current: Mutex<CurrentCycle>,
}

impl Shared {
    fn new(catalog: BuildingCatalog) -> Self {
        let (state, _) = watch::channel(PollState::new(&catalog));
        Self {
            catalog,
            state,
            current: Mutex::new(CurrentCycle::default()),
        }
    }

    /// Mutate the state, notifying watchers only on an actual change.
    fn update_state<F>(&self, f: F)
    where
        F: FnOnce(&mut PollState),
    {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    /// Start a new cycle, cancelling whatever request is still outstanding.
    fn begin_cycle(&self, parent: &CancellationToken) -> (u64, CancellationToken) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());

        self.update_state(PollState::begin_cycle);

        if let Some(previous) = current.token.take() {
            previous.cancel();
        }
        current.generation += 1;
        let token = parent.child_token();
        current.token = Some(token.clone());
        (current.generation, token)
    }

    /// Apply a request outcome if it still belongs to the current cycle.
    ///
    /// Returns whether the outcome was applied.
    fn finish(
        &self,
        generation: u64,
        token: &CancellationToken,
        outcome: Result<BuildingFeedResponse, FeedError>,
    ) -> bool {
        let current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if current.generation != generation || token.is_cancelled() {
            return false;
        }

        match outcome {
            Ok(raw) => {
                let result = FeedResult::from_response(&self.catalog, raw);
                self.update_state(|state| state.apply_success(&result, Utc::now()));
                true
            }
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                tracing::warn!("Building feed poll failed: {}", e);
                self.update_state(|state| state.apply_failure(&e));
                true
            }
        }
    }

    fn cancel_current(&self) {
        let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(token) = current.token.take() {
            token.cancel();
        }
    }
}

/// Handle to a mounted poll loop.
pub struct PollHandle {
    shared: Arc<Shared>,
    root: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Current state.
    pub fn state(&self) -> PollState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.shared.state.subscribe()
    }

    /// Stop the interval, cancel the outstanding request and wait for both.
    pub async fn unmount(mut self) {
        self.root.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Poll loop task failed: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Mount the poll loop: first cycle immediately, then every `interval`.
///
/// A zero interval is raised to [`MIN_INTERVAL`].
pub fn mount<S>(source: S, catalog: BuildingCatalog, interval: Duration) -> PollHandle
where
    S: FeedSource,
{
    let shared = Arc::new(Shared::new(catalog));
    let root = CancellationToken::new();
    let task = tokio::spawn(run_loop(
        Arc::new(source),
        Arc::clone(&shared),
        root.clone(),
        interval.max(MIN_INTERVAL),
    ));

    PollHandle {
        shared,
        root,
        task: Some(task),
    }
}

async fn run_loop<S>(
    source: Arc<S>,
    shared: Arc<Shared>,
    root: CancellationToken,
    interval: Duration,
) where
    S: FeedSource,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut requests: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = root.cancelled() => break,
            _ = ticker.tick() => {
                requests.retain(|request| !request.is_finished());
                let (generation, token) = shared.begin_cycle(&root);
                requests.push(tokio::spawn(poll_once(
                    Arc::clone(&source),
                    Arc::clone(&shared),
                    generation,
                    token,
                )));
            }
        }
    }

    shared.cancel_current();
    for request in requests {
        let _ = request.await;
    }
    tracing::debug!("Poll loop stopped");
}

async fn poll_once<S>(
    source: Arc<S>,
    shared: Arc<Shared>,
    generation: u64,
    token: CancellationToken,
) where
    S: FeedSource,
{
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        outcome = source.fetch(token.clone()) => outcome,
    };
    shared.finish(generation, &token, outcome);
}
