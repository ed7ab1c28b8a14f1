use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "senpai.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Directory for the chat UI's log file.
pub fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("senpai"))
}

/// File logging for the full-screen UI, where stderr belongs to the terminal.
/// Keep the guard alive until exit so buffered lines are flushed.
pub fn init_file() -> Option<WorkerGuard> {
    let filter = env_filter();

    let Some(dir) = log_dir() else {
        tracing_subscriber::registry().with(filter).init();
        return None;
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create log directory {:?}: {}. Logging disabled.", dir, e);
        tracing_subscriber::registry().with(filter).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    Some(guard)
}

/// Stderr logging for one-shot commands, so stdout carries only output.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
