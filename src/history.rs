use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::SharedState;
use crate::network::ReactorApi;
use crate::pipeline::Pipeline;
use crate::series::{age_ms, Sample, SeriesError};
use crate::util::lock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no timestamp")]
    MissingTimestamp,
    #[error("unparseable timestamp {0:?}")]
    BadTimestamp(String),
    #[error("non-numeric {field}")]
    BadValue { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRow {
    pub timestamp: i64,
    pub temperature_c: Option<f64>,
    pub ph: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub received: usize,
    pub malformed: usize,
    pub out_of_window: usize,
    pub loaded: usize,
}

fn millis(n: &serde_json::Number) -> Option<i64> {
    n.as_i64()
        .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

/// RFC 3339 first, then a naive ISO datetime read as local time.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.timestamp_millis())
}

fn row_timestamp(row: &Value) -> Result<i64, RowError> {
    // numeric `ts` wins; otherwise `timestamp` as number or string
    if let Some(Value::Number(n)) = row.get("ts") {
        return millis(n).ok_or_else(|| RowError::BadTimestamp(n.to_string()));
    }
    match row.get("timestamp") {
        Some(Value::Number(n)) => millis(n).ok_or_else(|| RowError::BadTimestamp(n.to_string())),
        Some(Value::String(s)) => parse_timestamp(s).ok_or_else(|| RowError::BadTimestamp(s.clone())),
        Some(other) => Err(RowError::BadTimestamp(other.to_string())),
        None => Err(RowError::MissingTimestamp),
    }
}

fn row_value(row: &Value, field: &'static str) -> Result<Option<f64>, RowError> {
    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(RowError::BadValue { field }),
        Some(_) => Err(RowError::BadValue { field }),
    }
}

pub fn parse_row(row: &Value) -> Result<HistoryRow, RowError> {
    Ok(HistoryRow {
        timestamp: row_timestamp(row)?,
        temperature_c: row_value(row, "temperature_c")?,
        ph: row_value(row, "ph")?,
    })
}

/// Downsample raw history rows onto the plotting grid and bulk-load them.
///
/// Rows are sorted, rows outside `(now - window, now]` are dropped, and the
/// pipeline's gate decides which of the rest are kept. The gate is left on
/// the last kept bucket so the first live poll continues the grid.
pub fn seed_rows(pipeline: &mut Pipeline, rows: &[Value], now: i64) -> Result<SeedReport, SeriesError> {
    let mut report = SeedReport {
        received: rows.len(),
        ..SeedReport::default()
    };

    let mut parsed: Vec<HistoryRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match parse_row(row) {
            Ok(r) => parsed.push(r),
            Err(e) => {
                debug!(error = %e, "skipping history row");
                report.malformed += 1;
            }
        }
    }
    parsed.sort_by_key(|r| r.timestamp);

    let window = pipeline.window_ms();
    let mut temperature = Vec::new();
    let mut ph = Vec::new();
    {
        let gate = pipeline.gate_mut();
        for row in parsed {
            if row.timestamp > now || age_ms(now, row.timestamp) >= window {
                report.out_of_window += 1;
                continue;
            }
            if gate.accept(row.timestamp) {
                temperature.push(Sample::new(row.timestamp, row.temperature_c));
                ph.push(Sample::new(row.timestamp, row.ph));
            }
        }
    }

    report.loaded = temperature.len();
    pipeline.load_seed(temperature, ph, now)?;
    Ok(report)
}

pub struct HistorySeeder<A> {
    api: Arc<A>,
    minutes: u32,
}

impl<A: ReactorApi> HistorySeeder<A> {
    pub fn new(api: Arc<A>, minutes: u32) -> Self {
        Self { api, minutes }
    }

    /// Backfill once, then move the pipeline to live. Failures are logged and
    /// leave both series empty; they never reach the caller.
    pub fn seed(&self, shared: &Mutex<SharedState>, clock: impl Fn() -> i64) {
        if !lock(shared).pipeline.begin_seeding() {
            debug!("history already seeded");
            return;
        }

        let fetched = self.api.fetch_history(self.minutes);
        let now = clock();

        let mut state = lock(shared);
        match fetched {
            Ok(rows) => match seed_rows(&mut state.pipeline, &rows, now) {
                Ok(report) => info!(
                    received = report.received,
                    malformed = report.malformed,
                    out_of_window = report.out_of_window,
                    loaded = report.loaded,
                    "history seeded"
                ),
                Err(e) => warn!(error = %e, "discarding inconsistent history"),
            },
            Err(e) => {
                warn!(error = %e, minutes = self.minutes, "history fetch failed");
                state.pipeline.abandon_seed();
            }
        }
        state.pipeline.go_live();
    }
}
