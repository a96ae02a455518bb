//! Logging Infrastructure
//!
//! Features:
//! - Console output (pretty for development, JSON for production)
//! - Daily rotating application logs under `logs/app` (deleted after 14 days)
//! - Permanent security logs under `logs/security` (target `security`)
//! - Permanent invariant logs under `logs/invariant` (target `invariant`)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Application logs older than this are removed
pub const APP_LOG_RETENTION_DAYS: i64 = 14;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Targets routed to their own permanent files
const SECURITY_TARGET: &str = "security";
const INVARIANT_TARGET: &str = "invariant";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn rolling_appender(dir: &Path, prefix: &str) -> anyhow::Result<RollingFileAppender> {
    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)?;
    Ok(appender)
}

/// File layer that only accepts events passing `accept`
fn file_layer<F>(
    appender: RollingFileAppender,
    json_format: bool,
    max_level: LevelFilter,
    accept: F,
) -> BoxedLayer
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    let filter = tracing_subscriber::filter::filter_fn(move |meta| {
        *meta.level() <= max_level && accept(meta.target())
    });
    let writer = std::sync::Mutex::new(appender);

    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed()
    }
}

/// Initialize the logging system with daily rotating logs
///
/// # Arguments
/// * `level` - Log level or filter directive (`RUST_LOG` takes precedence)
/// * `json_format` - JSON output (production) or pretty output (development)
/// * `log_dir` - Optional directory for file logging (e.g. `./work_dir/logs`)
///
/// # Examples
/// ```no_run
/// // Development setup (console only)
/// hub_server::utils::logger::init_logger_with_file("debug", false, None)?;
///
/// // Production setup (console + file)
/// hub_server::utils::logger::init_logger_with_file("info", true, Some("./work_dir/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let max_level: LevelFilter = level.parse().unwrap_or(LevelFilter::INFO);

    let mut layers: Vec<BoxedLayer> = Vec::new();

    // Console layer
    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);

        let app_log = rolling_appender(&log_dir.join("app"), "app")?;
        layers.push(file_layer(app_log, json_format, max_level, |target| {
            target != SECURITY_TARGET && target != INVARIANT_TARGET
        }));

        let security_log = rolling_appender(&log_dir.join("security"), "security")?;
        layers.push(file_layer(security_log, json_format, max_level, |target| {
            target == SECURITY_TARGET
        }));

        // 不变量违反总是记录，不受日志级别影响
        let invariant_log = rolling_appender(&log_dir.join("invariant"), "invariant")?;
        layers.push(file_layer(
            invariant_log,
            json_format,
            LevelFilter::TRACE,
            |target| target == INVARIANT_TARGET,
        ));
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
    Ok(())
}

/// Initialize the logging system (console only)
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}

/// Date encoded in an application log file name (`app.YYYY-MM-DD.log`)
fn app_log_date(name: &str) -> Option<chrono::NaiveDate> {
    let date_part = name.strip_prefix("app.")?.strip_suffix(".log")?;
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Clean up application log files older than [`APP_LOG_RETENTION_DAYS`]
///
/// Security and invariant logs are never deleted. Returns the number of
/// removed files.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);
    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(date) = app_log_date(name)
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Periodic cleanup task - runs every hour until shutdown
pub async fn periodic_cleanup(log_dir: PathBuf, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => return,
        }
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}
