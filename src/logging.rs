//! Diagnostic logging setup
//!
//! Stderr gets the configured level (default "info", overridable via
//! RUST_LOG). When file logging is enabled, a per-session debug log is
//! written through a non-blocking appender into the user cache directory
//! and stale session logs are removed on startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::UtcOffset;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

const LOG_RETENTION_DAYS: u64 = 7;

/// Log directory inside the user cache directory, created on demand.
/// Linux: `~/.cache/f1r3fly-io/inline-acceptance/`.
fn log_dir() -> io::Result<PathBuf> {
    let mut dir = dirs::cache_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "no user cache directory")
    })?;
    dir.push("f1r3fly-io");
    dir.push("inline-acceptance");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Removes `session-*.log` files older than the retention period. Individual
/// removal failures are reported to stderr and skipped.
fn cleanup_old_logs(dir: &Path) {
    let retention = std::time::Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let now = std::time::SystemTime::now();
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with("session-") || !name.ends_with(".log") {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            if let Err(e) = fs::remove_file(entry.path()) {
                eprintln!("failed to remove old log file {:?}: {}", entry.path(), e);
            }
        }
    }
}

fn stderr_filter(log_level: Option<&str>) -> EnvFilter {
    match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// An init failure is tolerated when a subscriber is already installed
/// (repeated init from tests or an embedding host).
fn tolerate_reinit(result: Result<(), impl std::error::Error>, guard: WorkerGuard) -> io::Result<WorkerGuard> {
    match result {
        Ok(()) => Ok(guard),
        Err(e) if e.to_string().contains("already been set") => Ok(guard),
        Err(e) => Err(io::Error::other(e.to_string())),
    }
}

/// Installs the global tracing subscriber. The returned guard owns the
/// non-blocking file writer and must be kept alive for the process lifetime.
pub fn init_logger(
    no_color: bool,
    log_level: Option<&str>,
    enable_file_logging: bool,
) -> io::Result<WorkerGuard> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!(
            "[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"
        ),
    );

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter(log_level));

    if !enable_file_logging {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        return tolerate_reinit(registry().with(stderr_layer).try_init(), guard);
    }

    let dir = log_dir()?;
    cleanup_old_logs(&dir);

    let timestamp = time::OffsetDateTime::now_utc()
        .format(&format_description!("[year][month][day]-[hour][minute][second]"))
        .map_err(io::Error::other)?;
    let log_path = dir.join(format!("session-{}-{}.log", timestamp, std::process::id()));
    let file = fs::OpenOptions::new().create(true).append(true).open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(timer)
        .with_ansi(false)
        // the session file always captures per-window flush diagnostics
        .with_filter(EnvFilter::new("debug"));

    let guard = tolerate_reinit(
        registry().with(stderr_layer).with(file_layer).try_init(),
        guard,
    )?;
    eprintln!("Logging to file: {:?}", log_path);
    Ok(guard)
}
