use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adguardfilter_core::Config;

/// Map a configured level to a filter directive.
///
/// Accepts the usual tracing names plus the short forms older deployments
/// used in `LOG_LEVEL` (`Err`, `Warn`, `Inf`, `Deb`). Unknown values fall
/// back to `info`.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "err" | "error" => "error",
        "warn" | "warning" => "warn",
        "inf" | "info" => "info",
        "deb" | "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

/// Log file for this host: `LOG_PATH` is used as a prefix for `<hostname>.log`.
pub fn log_file_path(prefix: &str, hostname: &str) -> String {
    format!("{}{}.log", prefix, hostname)
}

/// Set up logging to stderr and, when `LOG_PATH` is set, to a file.
///
/// `RUST_LOG` wins over `LOG_LEVEL`. The returned guard flushes the file
/// writer on drop and must be held until exit.
pub fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.log_level)));

    let (file_layer, guard) = match config.log_path.as_deref() {
        Some(prefix) => {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "adguardfilter".to_string());
            let full = log_file_path(prefix, &hostname);
            let path = Path::new(&full);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "adguardfilter.log".into());

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}
