//! In-memory `ReactorApi` for tests.

use std::sync::Mutex;

use reqwest::StatusCode;
use serde_json::Value;

use crate::network::{ControlConfig, FanAction, FetchError, ReactorApi, Status};
use crate::util::lock;

pub struct FakeApi {
    pub status: Mutex<Result<Status, StatusCode>>,
    pub history: Mutex<Result<Vec<Value>, StatusCode>>,
    pub fan: Mutex<Result<bool, StatusCode>>,
    pub threshold: Mutex<Result<f64, StatusCode>>,
    pub fan_calls: Mutex<Vec<FanAction>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            status: Mutex::new(Ok(Status::default())),
            history: Mutex::new(Ok(Vec::new())),
            fan: Mutex::new(Ok(false)),
            threshold: Mutex::new(Ok(28.0)),
            fan_calls: Mutex::new(Vec::new()),
        }
    }
}

impl ReactorApi for FakeApi {
    fn fetch_status(&self) -> Result<Status, FetchError> {
        lock(&self.status).clone().map_err(FetchError::Status)
    }

    fn fetch_history(&self, _minutes: u32) -> Result<Vec<Value>, FetchError> {
        lock(&self.history).clone().map_err(FetchError::Status)
    }

    fn set_fan(&self, action: FanAction) -> Result<bool, FetchError> {
        lock(&self.fan_calls).push(action);
        let mut fan = lock(&self.fan);
        if let Ok(running) = fan.as_mut() {
            *running = action == FanAction::Start;
        }
        fan.clone().map_err(FetchError::Status)
    }

    fn fetch_config(&self) -> Result<ControlConfig, FetchError> {
        let threshold = *lock(&self.threshold);
        threshold
            .map(|fan_temp_threshold| ControlConfig { fan_temp_threshold })
            .map_err(FetchError::Status)
    }

    fn set_fan_threshold(&self, celsius: f64) -> Result<ControlConfig, FetchError> {
        let mut threshold = lock(&self.threshold);
        if let Ok(current) = threshold.as_mut() {
            *current = celsius;
        }
        let threshold = *threshold;
        threshold
            .map(|fan_temp_threshold| ControlConfig { fan_temp_threshold })
            .map_err(FetchError::Status)
    }
}
