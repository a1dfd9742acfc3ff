pub const TICK_RATE_MS: u64 = 500; // UI redraw
pub const POLL_INTERVAL_MS: u64 = 2_000;
pub const PLOT_INTERVAL_MS: i64 = 10_000;
pub const HISTORY_WINDOW_MS: i64 = 30 * 60 * 1000;
pub const MAX_SAMPLES: usize = (HISTORY_WINDOW_MS / PLOT_INTERVAL_MS) as usize + 1;

pub const TEMP_AXIS: [f64; 2] = [10.0, 40.0];
pub const PH_AXIS: [f64; 2] = [5.0, 9.0];
pub const THRESHOLD_STEP_C: f64 = 0.5;
