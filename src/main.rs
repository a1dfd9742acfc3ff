//! Terminal dashboard for a reactor control loop: live temperature and pH
//! charts over a rolling 30 minute window, plus fan state and controls.

mod app;
mod chart;
mod constants;
mod control;
mod downsample;
#[cfg(test)]
mod fake;
mod history;
mod network;
mod pipeline;
mod poller;
mod series;
mod ui;
mod util;

use std::{
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::Parser;

use crate::app::SharedState;
use crate::constants::{HISTORY_WINDOW_MS, PLOT_INTERVAL_MS, POLL_INTERVAL_MS};
use crate::history::HistorySeeder;
use crate::network::HttpApi;
use crate::poller::LivePoller;
use crate::util::now_ms;

/// Live reactor dashboard
#[derive(Parser, Debug)]
#[command(name = "reactor_dash")]
#[command(about = "Watch reactor temperature, pH and fan state from a terminal")]
struct Args {
    /// Base URL of the reactor controller
    #[arg(long, env = "REACTOR_URL", default_value = "http://127.0.0.1:5050")]
    base_url: String,

    /// Status polling interval in milliseconds
    #[arg(long, default_value_t = POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Minutes of history requested at startup
    #[arg(long, default_value = "30")]
    history_minutes: u32,

    /// Transport timeout for each request in seconds
    #[arg(long, default_value = "30")]
    request_timeout_secs: u64,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, default_value = "reactor_dash.log")]
    log_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log = File::create(&args.log_file)
        .with_context(|| format!("failed to open log file {}", args.log_file.display()))?;
    // RUST_LOG takes precedence, fallback to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    tracing::info!(
        base_url = %args.base_url,
        poll_interval_ms = args.poll_interval_ms,
        history_minutes = args.history_minutes,
        "starting dashboard"
    );

    let api = Arc::new(
        HttpApi::new(&args.base_url, Duration::from_secs(args.request_timeout_secs))
            .context("failed to build HTTP client")?,
    );
    let shared = Arc::new(Mutex::new(SharedState::new(HISTORY_WINDOW_MS, PLOT_INTERVAL_MS)));
    let running = Arc::new(AtomicBool::new(true));

    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).context("failed to install signal handler")?;

    // Threshold fetch does not wait on the backfill
    control::spawn_config_load(Arc::clone(&api), Arc::clone(&shared));

    // Seed first, then poll: the poller must not run against a half-built window
    {
        let api = Arc::clone(&api);
        let shared = Arc::clone(&shared);
        let running = Arc::clone(&running);
        let minutes = args.history_minutes;
        let interval = Duration::from_millis(args.poll_interval_ms);
        thread::spawn(move || {
            HistorySeeder::new(Arc::clone(&api), minutes).seed(&shared, now_ms);
            LivePoller::new(api, shared, interval).run(running, now_ms);
        });
    }

    ui::run(api, shared, running, &args.base_url).context("terminal UI failed")?;
    tracing::info!("dashboard stopped");
    Ok(())
}
