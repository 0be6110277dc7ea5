//! Duel simulator entry point.
mod config;
mod scenario;

use std::path::Path;

use anyhow::Result;
use config::SimEnv;
use scenario::Duel;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = SimEnv::from_env().resolve()?;
    let _guard = setup_logging(config.log_file.as_deref())?;

    tracing::info!(
        tick_ms = config.tick_ms,
        duration_ms = config.duration_ms,
        "starting duel"
    );
    let report = Duel::new(config)?.run();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Logs to stderr, and additionally to `log_file` when one is configured.
///
/// The returned guard flushes the file writer on drop and must outlive the run.
fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().ok_or_else(|| {
                anyhow::anyhow!("Log file path has no file name: {}", path.display())
            })?;
            std::fs::create_dir_all(dir)?;

            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        tracing::info!("Log file: {}", path.display());
    }
    Ok(guard)
}
