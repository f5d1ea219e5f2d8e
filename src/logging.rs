use std::path::Path;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `TYPEALPHA_LOG=debug`
pub const LOG_ENV: &str = "TYPEALPHA_LOG";

/// Route `tracing` output to a daily log file under `log_dir`.
///
/// The terminal is in raw mode while playing, so nothing goes to stdout or
/// stderr. Keep the returned guard alive for the life of the program.
pub fn init(log_dir: &Path, verbose: bool) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "typealpha.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // a second init in the same process (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    tracing::info!(dir = %log_dir.display(), verbose, "logging initialized");
    Ok(guard)
}
