use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

// Wall clock in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Lock, recovering the data from a poisoned mutex.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn format_reading(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "--".to_string(),
    }
}

/// Axis label for an offset in seconds relative to now.
pub fn format_relative_tick(seconds: f64) -> String {
    let v = seconds.round() as i64;
    if v == 0 {
        return "now".to_string();
    }
    let ago = -v;
    if ago < 60 {
        let s = ((ago as f64 / 5.0).round() as i64) * 5;
        format!("-{} s", s)
    } else {
        let m = (ago as f64 / 60.0).round() as i64;
        format!("-{} min", m)
    }
}
