use std::{sync::Mutex, time::Instant};

use crate::chart::{project, Projection};
use crate::network::{AlgaeStatus, Status};
use crate::pipeline::{Pipeline, PipelineState};
use crate::util::lock;

/// Latest status snapshot and the time its request was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub requested_at: i64,
    pub status: Status,
}

// Shared between the poller, control threads and the UI thread
pub struct SharedState {
    pub pipeline: Pipeline,
    pub reading: Option<Reading>,
    pub threshold: Option<f64>,
    pub link_error: Option<String>,
    pub notice: Option<String>,
}

impl SharedState {
    pub fn new(window_ms: i64, cadence_ms: i64) -> Self {
        Self {
            pipeline: Pipeline::new(window_ms, cadence_ms),
            reading: None,
            threshold: None,
            link_error: None,
            notice: None,
        }
    }

    /// Keep `status` for the readouts unless a newer request already answered.
    pub fn record_reading(&mut self, requested_at: i64, status: Status) -> bool {
        if let Some(current) = &self.reading {
            if current.requested_at > requested_at {
                return false;
            }
        }
        self.reading = Some(Reading { requested_at, status });
        true
    }

    pub fn fan_running(&self) -> bool {
        self.reading.as_ref().is_some_and(|r| r.status.fan_running)
    }

    pub fn set_fan_running(&mut self, running: bool) {
        if let Some(reading) = &mut self.reading {
            reading.status.fan_running = running;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardState {
    #[default]
    Neutral,
    Good,
    Warn,
    Bad,
}

pub fn classify_temperature(celsius: f64) -> CardState {
    if (20.0..=30.0).contains(&celsius) {
        CardState::Good
    } else if (18.0..=32.0).contains(&celsius) {
        CardState::Warn
    } else {
        CardState::Bad
    }
}

pub fn classify_ph(ph: f64) -> CardState {
    if (6.5..=8.5).contains(&ph) {
        CardState::Good
    } else if (6.0..=9.0).contains(&ph) {
        CardState::Warn
    } else {
        CardState::Bad
    }
}

// What the UI thread draws
pub struct App {
    pub temperature: Projection,
    pub ph: Projection,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
    pub ph_value: Option<f64>,
    pub fan_running: bool,
    pub algae: Option<AlgaeStatus>,
    pub temp_card: CardState,
    pub ph_card: CardState,
    pub threshold: Option<f64>,
    pub link_error: Option<String>,
    pub notice: Option<String>,
    pub phase: PipelineState,
    pub last_tick: Instant,
}

impl App {
    pub fn new() -> App {
        App {
            temperature: Projection::default(),
            ph: Projection::default(),
            temperature_c: None,
            temperature_f: None,
            ph_value: None,
            fan_running: false,
            algae: None,
            temp_card: CardState::Neutral,
            ph_card: CardState::Neutral,
            threshold: None,
            link_error: None,
            notice: None,
            phase: PipelineState::Uninitialized,
            last_tick: Instant::now(),
        }
    }

    pub fn on_tick(&mut self, shared: &Mutex<SharedState>, now: i64) {
        let state = lock(shared);

        self.temperature = project(state.pipeline.temperature(), now);
        self.ph = project(state.pipeline.ph(), now);
        self.phase = state.pipeline.state();
        self.threshold = state.threshold;
        self.link_error = state.link_error.clone();
        self.notice = state.notice.clone();

        if let Some(reading) = &state.reading {
            let status = &reading.status;
            self.temperature_c = status.temperature_c;
            self.temperature_f = status.temperature_f;
            self.ph_value = status.ph;
            self.fan_running = status.fan_running;
            self.algae = status.algae_status.clone();

            // an absent reading keeps the previous color
            if let Some(c) = status.temperature_c {
                self.temp_card = classify_temperature(c);
            }
            if let Some(ph) = status.ph {
                self.ph_card = classify_ph(ph);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(temperature_c: Option<f64>, ph: Option<f64>) -> Status {
        Status {
            temperature_c,
            ph,
            ..Status::default()
        }
    }

    #[test]
    fn card_thresholds() {
        assert_eq!(classify_temperature(25.0), CardState::Good);
        assert_eq!(classify_temperature(30.0), CardState::Good);
        assert_eq!(classify_temperature(31.5), CardState::Warn);
        assert_eq!(classify_temperature(17.9), CardState::Bad);
        assert_eq!(classify_ph(7.0), CardState::Good);
        assert_eq!(classify_ph(6.2), CardState::Warn);
        assert_eq!(classify_ph(9.5), CardState::Bad);
    }

    #[test]
    fn newer_request_wins_the_readouts() {
        let mut state = SharedState::new(1_800_000, 10_000);
        assert!(state.record_reading(2_000, status(Some(26.0), None)));
        assert!(!state.record_reading(1_000, status(Some(20.0), None)));
        assert_eq!(state.reading.as_ref().and_then(|r| r.status.temperature_c), Some(26.0));
    }

    #[test]
    fn absent_value_keeps_previous_card_color() {
        let shared = Mutex::new(SharedState::new(1_800_000, 10_000));
        let mut app = App::new();

        lock(&shared).record_reading(1_000, status(Some(35.0), Some(7.0)));
        app.on_tick(&shared, 1_000);
        assert_eq!(app.temp_card, CardState::Bad);
        assert_eq!(app.ph_card, CardState::Good);

        lock(&shared).record_reading(3_000, status(None, None));
        app.on_tick(&shared, 3_000);
        assert_eq!(app.temperature_c, None);
        assert_eq!(app.temp_card, CardState::Bad);
        assert_eq!(app.ph_card, CardState::Good);
    }

    #[test]
    fn tick_projects_both_series() {
        let shared = Mutex::new(SharedState::new(1_800_000, 10_000));
        {
            let mut state = lock(&shared);
            state.pipeline.begin_seeding();
            state.pipeline.go_live();
            state.pipeline.ingest(10_000, Some(25.0), None, 10_000).unwrap();
        }
        let mut app = App::new();
        app.on_tick(&shared, 15_000);
        assert_eq!(app.phase, PipelineState::Live);
        assert_eq!(app.temperature.points.len(), 1);
        assert_eq!(app.ph.points[0].y, None);
        assert_eq!(app.ph.points[0].x, -5.0);
    }
}
