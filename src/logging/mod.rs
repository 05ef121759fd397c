//! Логирование на `tracing`: консольный и файловый sink, фильтр из
//! конфигурации или `RUST_LOG`.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{FileSinkConfig, LogFormat, LoggingConfig};
use fanout_error::{FanoutResult, LogLevel, LoggingError, StackError};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный подписчик `tracing`.
///
/// Повторный вызов возвращает ошибку: глобальный подписчик уже установлен.
pub fn init_logging(config: LoggingConfig) -> FanoutResult<LoggingHandle> {
    config.validate()?;

    let env_filter = filters::build_filter(&config);
    let mut layers = Vec::new();

    layers.push(sinks::console::layer(&config));

    let file_guard = match &config.file {
        Some(file) => {
            let (file_layer, guard) = sinks::file::layer(&config, file)?;
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::Install {
            reason: e.to_string(),
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.build_filter_directive(),
        format = %config.format,
        file_enabled = config.file.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}

/// Логирует ошибку на уровне, соответствующем её коду статуса.
pub fn log_error(err: &StackError) {
    let code = err.status_code();
    match err.log_level() {
        LogLevel::Error => tracing::error!(code = code.code(), error = %err, "operation failed"),
        LogLevel::Warn => tracing::warn!(code = code.code(), error = %err, "operation failed"),
        LogLevel::Info => tracing::info!(code = code.code(), error = %err, "operation failed"),
        LogLevel::Debug => tracing::debug!(code = code.code(), error = %err, "operation failed"),
    }
}
