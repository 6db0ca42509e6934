use std::path::PathBuf;

use courtside::infrastructure::environment::{self, get_log_directory};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,courtside=info";

/// Loads `.env`, then installs the console subscriber and, when `LOG_DIRECTORY` is set, a daily log file.
/// The returned guard flushes the file writer and must live as long as the bot.
pub fn init_logger() -> Option<WorkerGuard> {
    let env_file = load_env_file();
    let guard = init_tracing();
    info!("Starting Courtside...");
    log_env_file_result(env_file);
    guard
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(environment::LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn init_tracing() -> Option<WorkerGuard> {
    let (file_layer, guard) = match get_log_directory() {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "courtside.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();
    guard
}

fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

fn log_env_file_result(env_file: Option<PathBuf>) {
    if let Some(path) = env_file {
        info!("Loaded environment variables from {}", path.display());
    } else {
        info!("No .env file found, proceeding with system environment variables.");
    }
}
