use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};

use tracing::{info, warn};

use crate::app::SharedState;
use crate::network::{FanAction, ReactorApi};
use crate::util::lock;

/// Read the fan threshold once at startup.
pub fn load_config<A: ReactorApi>(api: &A, shared: &Mutex<SharedState>) {
    match api.fetch_config() {
        Ok(config) => {
            info!(threshold = config.fan_temp_threshold, "loaded fan threshold");
            lock(shared).threshold = Some(config.fan_temp_threshold);
        }
        Err(e) => warn!(error = %e, "config fetch failed"),
    }
}

/// Fetch the threshold on its own thread, independent of the backfill.
pub fn spawn_config_load<A: ReactorApi>(api: Arc<A>, shared: Arc<Mutex<SharedState>>) -> JoinHandle<()> {
    thread::spawn(move || load_config(api.as_ref(), &shared))
}

/// Start the fan if the last snapshot says it is off, stop it otherwise.
pub fn toggle_fan<A: ReactorApi>(api: Arc<A>, shared: Arc<Mutex<SharedState>>) -> JoinHandle<()> {
    let action = if lock(&shared).fan_running() {
        FanAction::Stop
    } else {
        FanAction::Start
    };

    thread::spawn(move || match api.set_fan(action) {
        Ok(running) => {
            info!(?action, running, "fan command applied");
            let mut state = lock(&shared);
            state.set_fan_running(running);
            state.notice = None;
        }
        Err(e) => {
            warn!(?action, error = %e, "fan command failed");
            lock(&shared).notice = Some(format!("fan {:?} failed: {}", action, e));
        }
    })
}

/// Move the fan threshold by `delta` °C. Does nothing until the current
/// threshold is known.
pub fn nudge_threshold<A: ReactorApi>(
    api: Arc<A>,
    shared: Arc<Mutex<SharedState>>,
    delta: f64,
) -> Option<JoinHandle<()>> {
    let threshold = lock(&shared).threshold;
    let Some(current) = threshold else {
        lock(&shared).notice = Some("fan threshold unknown".to_string());
        return None;
    };
    let target = current + delta;

    Some(thread::spawn(move || match api.set_fan_threshold(target) {
        Ok(config) => {
            info!(threshold = config.fan_temp_threshold, "fan threshold updated");
            let mut state = lock(&shared);
            state.threshold = Some(config.fan_temp_threshold);
            state.notice = None;
        }
        Err(e) => {
            warn!(target, error = %e, "threshold update failed");
            lock(&shared).notice = Some(format!("threshold update failed: {}", e));
        }
    }))
}
