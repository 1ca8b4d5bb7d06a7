use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use syncra_error::{ensure, GenericError, ResultExt, StackError, StackResult, StatusCode};

use crate::logging::LoggingConfig;

pub const DEFAULT_MAX_PENDING: usize = 1024;
pub const DEFAULT_MAX_POOL_SIZE: usize = 8;
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 60_000;

/// Настройки шины событий.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EventBusSettings {
    /// Предел необработанных сообщений на обработчик.
    pub max_pending: usize,
}

/// Настройки пула потоков.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorSettings {
    pub max_pool_size: usize,
    /// Сколько миллисекунд рабочий ждёт работы перед завершением.
    pub keep_alive_ms: u64,
}

/// Корневые настройки.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub event_bus: EventBusSettings,
    pub executor: ExecutorSettings,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки без файла: значения по умолчанию плюс окружение.
    pub fn load() -> StackResult<Self> {
        Self::load_from(None)
    }

    /// Загружает настройки слоями: значения по умолчанию, затем файл
    /// (TOML/YAML/JSON по расширению), затем переменные окружения вида
    /// `SYNCRA__EVENT_BUS__MAX_PENDING=64`.
    pub fn load_from(path: Option<&Path>) -> StackResult<Self> {
        let mut builder = Config::builder()
            .set_default("event_bus.max_pending", DEFAULT_MAX_PENDING as u64)
            .map_err(config_error)?
            .set_default("executor.max_pool_size", DEFAULT_MAX_POOL_SIZE as u64)
            .map_err(config_error)?
            .set_default("executor.keep_alive_ms", DEFAULT_KEEP_ALIVE_MS)
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("SYNCRA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        settings.validate().context("validating settings")?;
        Ok(settings)
    }

    pub fn validate(&self) -> StackResult<()> {
        ensure!(
            self.event_bus.max_pending >= 1,
            StatusCode::InvalidConfig,
            "event_bus.max_pending must be at least 1"
        );
        ensure!(
            self.executor.max_pool_size >= 1,
            StatusCode::InvalidConfig,
            "executor.max_pool_size must be at least 1"
        );
        self.logging.validate()
    }
}

fn config_error(err: ConfigError) -> StackError {
    StackError::new(GenericError::new(
        StatusCode::ConfigLoadFailed,
        err.to_string(),
    ))
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
        }
    }
}
