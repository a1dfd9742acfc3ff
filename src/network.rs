use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Snapshot served by `/api/status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub temperature_f: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub fan_running: bool,
    #[serde(default)]
    pub algae_status: Option<AlgaeStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlgaeStatus {
    pub status: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub message: String,
}

// Rows are kept raw so one malformed row cannot fail the whole payload
#[derive(Debug, Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FanAction {
    Start,
    Stop,
}

#[derive(Serialize)]
struct FanRequest {
    action: FanAction,
}

#[derive(Deserialize)]
struct FanResponse {
    fan_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    pub fan_temp_threshold: f64,
}

/// The reactor controller's HTTP surface.
pub trait ReactorApi: Send + Sync + 'static {
    fn fetch_status(&self) -> Result<Status, FetchError>;
    /// Raw history rows covering at least `minutes`, in no guaranteed order.
    fn fetch_history(&self, minutes: u32) -> Result<Vec<Value>, FetchError>;
    /// Returns whether the fan is running afterwards.
    fn set_fan(&self, action: FanAction) -> Result<bool, FetchError>;
    fn fetch_config(&self) -> Result<ControlConfig, FetchError>;
    fn set_fan_threshold(&self, celsius: f64) -> Result<ControlConfig, FetchError>;
}

pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn checked(resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FetchError::Status(status))
    }
}

fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    let body = checked(resp)?.bytes()?;
    Ok(serde_json::from_slice(&body)?)
}

impl ReactorApi for HttpApi {
    fn fetch_status(&self) -> Result<Status, FetchError> {
        decode(self.client.get(self.url("/api/status")).send()?)
    }

    fn fetch_history(&self, minutes: u32) -> Result<Vec<Value>, FetchError> {
        let resp = self
            .client
            .get(self.url("/api/history"))
            .query(&[("minutes", minutes)])
            .send()?;
        let payload: HistoryPayload = decode(resp)?;
        Ok(payload.data)
    }

    fn set_fan(&self, action: FanAction) -> Result<bool, FetchError> {
        let resp = self
            .client
            .post(self.url("/api/fan"))
            .json(&FanRequest { action })
            .send()?;
        let body: FanResponse = decode(resp)?;
        Ok(body.fan_running)
    }

    fn fetch_config(&self) -> Result<ControlConfig, FetchError> {
        decode(self.client.get(self.url("/api/config")).send()?)
    }

    fn set_fan_threshold(&self, celsius: f64) -> Result<ControlConfig, FetchError> {
        let resp = self
            .client
            .post(self.url("/api/config"))
            .json(&ControlConfig { fan_temp_threshold: celsius })
            .send()?;
        decode(resp)
    }
}
