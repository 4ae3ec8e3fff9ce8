/// Telemetry Module - Structured Logging with Tracing
///
/// - Structured logging with tracing
/// - JSON vs pretty format support
/// - File logging with daily rotation
/// - RUST_LOG env var support
/// - Truncation helpers for txids and address lists

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, UtxoError};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub log_level: String,
    /// Log format: "json" or "pretty"
    pub log_format: String,
    /// Optional log file path (None = console only)
    pub log_file: Option<String>,
    /// Rotation interval: "daily", "hourly", "never"
    pub rotation: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: std::env::var("RUSTYUTXO_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            log_file: std::env::var("RUSTYUTXO_LOG_FILE").ok(),
            rotation: "daily".to_string(),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns the file writer guard when logging to a file; keep it alive for
/// the life of the process or buffered lines are lost.
pub fn init_tracing(config: TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let json = config.log_format == "json";

    let Some(log_file_path) = config.log_file else {
        let registry = tracing_subscriber::registry().with(env_filter);
        let result = if json {
            registry
                .with(fmt::layer().json().with_current_span(true).with_span_list(true))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(false).with_file(true).with_line_number(true))
                .try_init()
        };
        result.map_err(|e| UtxoError::Config(format!("tracing init failed: {}", e)))?;
        return Ok(None);
    };

    let path = std::path::Path::new(&log_file_path);
    let directory = path
        .parent()
        .ok_or_else(|| UtxoError::Config("Invalid log file path: no parent directory".to_string()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| UtxoError::Config("Invalid log file path: no filename".to_string()))?;
    let filename_prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| UtxoError::Config("Invalid log file path: no filename".to_string()))?;

    let file_appender = match config.rotation.as_str() {
        "hourly" => rolling::hourly(directory, filename_prefix),
        "never" => rolling::never(directory, file_name),
        _ => rolling::daily(directory, filename_prefix),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(non_blocking),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .try_init()
    };
    result.map_err(|e| UtxoError::Config(format!("tracing init failed: {}", e)))?;

    Ok(Some(guard))
}

/// Truncate hex string for logging
///
/// Example: "0a1b2c3d4e5f67890a1b2c3d4e5f6789" → "0a1b2c3d4e5f6789..."
///
/// `len` counts characters, so imported non-hex ids never split a code point.
pub fn truncate_hex(hex: &str, len: usize) -> String {
    match hex.char_indices().nth(len) {
        Some((cut, _)) => format!("{}...", &hex[..cut]),
        None => hex.to_string(),
    }
}

/// Truncate list for logging
///
/// Example: ["a", "b", "c", "d", "e", "f"] (max 3) → "[3 of 6]: [a, b, c]"
pub fn truncate_list<T: std::fmt::Display + std::fmt::Debug>(items: &[T], max: usize) -> String {
    if items.len() <= max {
        format!("{:?}", items)
    } else {
        let preview: Vec<String> = items.iter().take(max).map(|i| i.to_string()).collect();
        format!("[{} of {}]: {:?}", max, items.len(), preview)
    }
}
