//! Logging Infrastructure
//!
//! Structured logging for hosts embedding the client. `RUST_LOG` overrides
//! the level passed in.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger with optional JSON formatting and daily-rolling file output
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) -> bool {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // 文件输出: 目录存在时按天滚动
    if let Some(dir) = log_dir
        && Path::new(dir).is_dir()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "dine-client");
        let builder = builder.with_writer(file_appender).with_ansi(false);
        return if json {
            builder.json().try_init().is_ok()
        } else {
            builder.try_init().is_ok()
        };
    }

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
