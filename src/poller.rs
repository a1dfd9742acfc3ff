use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, trace, warn};

use crate::app::SharedState;
use crate::network::{FetchError, ReactorApi, Status};
use crate::pipeline::Ingest;
use crate::util::lock;

/// Polls `/api/status` on a fixed interval.
///
/// Each request runs on its own thread, so a slow request never delays the
/// next tick and responses may come back out of order. Every sample is
/// stamped with its request time and the shared cadence gate sorts it out.
pub struct LivePoller<A> {
    api: Arc<A>,
    shared: Arc<Mutex<SharedState>>,
    interval: Duration,
}

impl<A: ReactorApi> LivePoller<A> {
    pub fn new(api: Arc<A>, shared: Arc<Mutex<SharedState>>, interval: Duration) -> Self {
        Self { api, shared, interval }
    }

    /// Fire one request stamped `requested_at`.
    pub fn poll_once(&self, requested_at: i64, clock: fn() -> i64) -> JoinHandle<Option<Ingest>> {
        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            let result = api.fetch_status();
            deliver(&shared, requested_at, result, clock())
        })
    }

    /// Tick until `running` is cleared. Outstanding requests are not awaited.
    pub fn run(self, running: Arc<AtomicBool>, clock: fn() -> i64) {
        while running.load(Ordering::SeqCst) {
            let _ = self.poll_once(clock(), clock);
            thread::sleep(self.interval);
        }
        debug!("live poller stopped");
    }
}

/// Apply one status response to the readouts and the plotted series.
pub fn deliver(
    shared: &Mutex<SharedState>,
    requested_at: i64,
    result: Result<Status, FetchError>,
    now: i64,
) -> Option<Ingest> {
    let status = match result {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "status fetch failed");
            lock(shared).link_error = Some(e.to_string());
            return None;
        }
    };

    let mut state = lock(shared);
    state.link_error = None;
    let (temperature, ph) = (status.temperature_c, status.ph);
    if !state.record_reading(requested_at, status) {
        trace!(requested_at, "stale status ignored for readouts");
    }

    match state.pipeline.ingest(requested_at, temperature, ph, now) {
        Ok(outcome) => {
            trace!(requested_at, ?outcome, "live sample");
            Some(outcome)
        }
        Err(e) => {
            warn!(error = %e, "live sample rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeApi;
    use reqwest::StatusCode;

    const WINDOW: i64 = 1_800_000;
    const CADENCE: i64 = 10_000;

    fn live_state() -> Mutex<SharedState> {
        let mut state = SharedState::new(WINDOW, CADENCE);
        state.pipeline.begin_seeding();
        state.pipeline.go_live();
        Mutex::new(state)
    }

    fn status(t: Option<f64>, ph: Option<f64>) -> Result<Status, FetchError> {
        Ok(Status {
            temperature_c: t,
            ph,
            ..Status::default()
        })
    }

    #[test]
    fn two_second_polls_plot_once_per_bucket() {
        let shared = live_state();
        let mut appended = 0;
        for t in (0..60_000).step_by(2_000) {
            if deliver(&shared, t, status(Some(25.0), Some(7.0)), t) == Some(Ingest::Appended) {
                appended += 1;
            }
        }
        assert_eq!(appended, 6);
        assert_eq!(lock(&shared).pipeline.temperature().len(), 6);
    }

    #[test]
    fn null_ph_still_grows_the_series() {
        let shared = live_state();
        assert_eq!(deliver(&shared, 5_000, status(Some(24.0), None), 5_000), Some(Ingest::Appended));
        let state = lock(&shared);
        assert_eq!(state.pipeline.ph().len(), 1);
        assert_eq!(state.pipeline.ph().last().map(|s| s.value), Some(None));
    }

    #[test]
    fn out_of_order_responses_keep_the_newest() {
        let shared = live_state();
        let (now1, now2) = (18_000, 21_000);

        assert_eq!(deliver(&shared, now2, status(Some(26.0), Some(7.2)), 21_400), Some(Ingest::Appended));
        assert_eq!(deliver(&shared, now1, status(Some(25.0), Some(7.1)), 21_600), Some(Ingest::Gated));

        let state = lock(&shared);
        let stamps: Vec<i64> = state.pipeline.temperature().iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![now2]);
        assert_eq!(state.reading.as_ref().map(|r| r.requested_at), Some(now2));
    }

    #[test]
    fn transport_failure_changes_nothing_but_the_link_error() {
        let shared = live_state();
        deliver(&shared, 1_000, status(Some(25.0), Some(7.0)), 1_000);
        let outcome = deliver(&shared, 11_000, Err(FetchError::Status(StatusCode::BAD_GATEWAY)), 11_000);
        assert_eq!(outcome, None);

        let state = lock(&shared);
        assert_eq!(state.pipeline.temperature().len(), 1);
        assert!(state.link_error.is_some());
    }

    #[test]
    fn polls_before_seeding_finishes_only_update_readouts() {
        let shared = Mutex::new(SharedState::new(WINDOW, CADENCE));
        assert_eq!(deliver(&shared, 1_000, status(Some(25.0), None), 1_000), Some(Ingest::NotLive));
        let state = lock(&shared);
        assert!(state.pipeline.temperature().is_empty());
        assert!(state.reading.is_some());
    }

    #[test]
    fn poll_once_goes_through_the_api() {
        let api = Arc::new(FakeApi::default());
        *lock(&api.status) = Ok(Status {
            temperature_c: Some(23.0),
            ph: Some(7.4),
            ..Status::default()
        });
        let shared = Arc::new(live_state());
        let poller = LivePoller::new(api, Arc::clone(&shared), Duration::from_millis(2_000));

        let outcome = poller.poll_once(40_000, || 40_100).join().unwrap();
        assert_eq!(outcome, Some(Ingest::Appended));
        assert_eq!(lock(&shared).pipeline.ph().last().map(|s| s.value), Some(Some(7.4)));
    }
}
