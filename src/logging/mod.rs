//! Логирование на `tracing` и `tracing-subscriber`.
//!
//! - `config`: `LoggingConfig` и переопределения из окружения.
//! - `filters` (приватный): построение `EnvFilter`.
//! - `formatter` (приватный): compact/pretty/json fmt-слои.
//! - `handle`: `LoggingHandle`, держит guard файлового writer'а.
//! - `sinks`: консольный и файловый слои.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, RotationPolicy};
pub use handle::{LoggingHandle, LoggingStats};
use syncra_error::{GenericError, StackError, StackResult, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация глобального subscriber'а по конфигурации.
///
/// Порядок: переопределения из окружения, валидация, создание каталога
/// логов, сборка слоёв. Повторная инициализация в том же процессе даёт
/// ошибку.
pub fn init_logging(mut config: LoggingConfig) -> StackResult<LoggingHandle> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file.enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(&config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| {
            StackError::new(GenericError::new(
                StatusCode::InvalidState,
                format!("global subscriber already installed: {e}"),
            ))
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_dir = %config.log_dir.display(),
        console_enabled = config.console.enabled,
        file_enabled = config.file.enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
