use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Registry,
    Layer,
};
use tracing_appender::{rolling, non_blocking};

use crate::error::{AeroTrackError, AeroResult};

/// Logging configuration for AeroTrack
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub enable_file_logging: bool,
    pub enable_json_format: bool,
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            enable_file_logging: false,
            enable_json_format: false,
            max_log_files: 10,
        }
    }
}

/// Initialize the logging system.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> AeroResult<Option<WorkerGuard>> {
    if config.enable_file_logging {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| AeroTrackError::file_io(
                config.log_dir.to_string_lossy().to_string(),
                e
            ))?;
    }

    // Keep sqlx quiet, it logs every statement at info
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "aerotrack={},sqlx=warn,reqwest=warn,{}",
                config.level, config.level
            ))
        });

    let registry = Registry::default().with(env_filter);

    let guard = if config.enable_file_logging {
        let file_appender = rolling::daily(&config.log_dir, "aerotrack.log");
        let (file_writer, guard) = non_blocking(file_appender);

        let file_layer = if config.enable_json_format {
            fmt::layer()
                .json()
                .with_writer(file_writer)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .boxed()
        };

        // Chat output owns the terminal, so file logging replaces the console
        registry.with(file_layer).try_init()
            .map_err(|e| AeroTrackError::configuration(format!("logging already initialized: {}", e)))?;
        Some(guard)
    } else {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .compact()
            .boxed();

        registry.with(console_layer).try_init()
            .map_err(|e| AeroTrackError::configuration(format!("logging already initialized: {}", e)))?;
        None
    };

    info!("✈️  AeroTrack logging initialized");
    info!("Log level: {}", config.level);

    if config.enable_file_logging {
        info!("File logging enabled: {}", config.log_dir.display());
    }

    Ok(guard)
}

/// Log system information for debugging
pub fn log_system_info() {
    info!("✈️  AeroTrack v{} - fleet maintenance assistant", env!("CARGO_PKG_VERSION"));
    info!("System: {} {}", std::env::consts::OS, std::env::consts::ARCH);

    if let Ok(cwd) = std::env::current_dir() {
        info!("Working directory: {}", cwd.display());
    }
}

/// Performance logging utilities
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation: String,
}

impl PerformanceTimer {
    pub fn start(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::debug!("⏱️  Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    pub fn checkpoint(&self, checkpoint: &str) {
        let elapsed = self.start.elapsed();
        tracing::debug!("⏱️  {} - {}: {}ms", self.operation, checkpoint, elapsed.as_millis());
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        info!("⏱️  Completed {}: {}ms", self.operation, elapsed.as_millis());
    }
}

/// Clean up old log files
pub fn cleanup_old_logs(config: &LoggingConfig) -> AeroResult<usize> {
    if !config.enable_file_logging || !config.log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();

    let entries = fs::read_dir(&config.log_dir)
        .map_err(|e| AeroTrackError::file_io(
            config.log_dir.to_string_lossy().to_string(),
            e
        ))?;

    for entry in entries {
        let entry = entry.map_err(|e| AeroTrackError::file_io(
            config.log_dir.to_string_lossy().to_string(),
            e
        ))?;

        let path = entry.path();
        let is_log = path.file_name()
            .and_then(|s| s.to_str())
            .map_or(false, |name| name.starts_with("aerotrack.log"));
        if is_log {
            if let Ok(metadata) = fs::metadata(&path) {
                log_files.push((path, metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH)));
            }
        }
    }

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    if log_files.len() > config.max_log_files {
        for (path, _) in &log_files[config.max_log_files..] {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove old log file {}: {}", path.display(), e);
            } else {
                info!("Removed old log file: {}", path.display());
                removed += 1;
            }
        }
    }

    Ok(removed)
}

/// Log an error together with its recoverability
#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            recoverable = $error.is_recoverable(),
            "AeroTrack error occurred"
        );
    };
}

#[macro_export]
macro_rules! log_turn_start {
    ($user:expr, $chars:expr) => {
        tracing::info!(
            user = %$user,
            chars = $chars,
            "✈️  Starting chat turn"
        );
    };
}
