//! Logging setup for the station binary

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Build the filter from `LOG_LEVEL` directives (`info`, `label_printer=debug,warn`, ...)
fn env_filter(log_level: Option<&str>) -> EnvFilter {
    let directives = log_level.unwrap_or("info");
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logger, writing to a daily rolling file when `log_dir` exists
pub fn init_logger(log_level: Option<&str>, log_dir: Option<&str>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "label-station");
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}
