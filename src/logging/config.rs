use std::{collections::HashMap, fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use syncra_error::{ensure, ResultExt, StackResult, StatusCode};

/// Уровни, которые понимает `EnvFilter` в директивах.
const KNOWN_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Одна строка на событие.
    #[default]
    Compact,
    /// Многострочный вывод для разработки.
    Pretty,
    /// JSON, по объекту на строку.
    Json,
}

/// Периодичность ротации файла логов.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Never,
    Hourly,
    #[default]
    Daily,
}

/// Настройки вывода в консоль.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Формат консоли; если не задан, используется общий `format`.
    pub format: Option<LogFormat>,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Имена и идентификаторы потоков. Для синхронизаторов это основной
    /// способ понять, кто кого ждал.
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Настройки вывода в файл.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Префикс имени файла внутри `log_dir`.
    pub filename: String,
    pub rotation: RotationPolicy,
    pub format: LogFormat,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень для всех целей.
    pub level: String,
    /// Уровни для отдельных модулей: `"syncra::pubsub" = "trace"`.
    pub module_levels: HashMap<String, String>,
    pub format: LogFormat,
    pub log_dir: PathBuf,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoggingConfig {
    /// Применяет переопределения из окружения.
    ///
    /// - `SYNCRA_LOG_LEVEL`: базовый уровень;
    /// - `SYNCRA_LOG_FORMAT`: `compact`, `pretty` или `json`;
    /// - `SYNCRA_LOG_DIR`: каталог для файлов логов.
    ///
    /// Неизвестный формат игнорируется.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SYNCRA_LOG_LEVEL") {
            self.level = level.to_lowercase();
        }
        if let Ok(format) = std::env::var("SYNCRA_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "compact" => self.format = LogFormat::Compact,
                "pretty" => self.format = LogFormat::Pretty,
                "json" => self.format = LogFormat::Json,
                _ => {}
            }
        }
        if let Ok(dir) = std::env::var("SYNCRA_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> StackResult<()> {
        ensure!(
            is_known_level(&self.level),
            StatusCode::InvalidConfig,
            "unknown log level: {}",
            self.level
        );
        for (module, level) in &self.module_levels {
            ensure!(
                !module.is_empty(),
                StatusCode::InvalidConfig,
                "module name in module_levels must not be empty"
            );
            ensure!(
                is_known_level(level),
                StatusCode::InvalidConfig,
                "unknown log level for {}: {}",
                module,
                level
            );
        }
        if self.file.enabled {
            ensure!(
                !self.file.filename.is_empty(),
                StatusCode::InvalidConfig,
                "file.filename must not be empty when file logging is enabled"
            );
        }
        Ok(())
    }

    /// Создаёт `log_dir`, если включён вывод в файл.
    pub fn ensure_log_dir(&self) -> StackResult<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.log_dir)
                .with_context(|| format!("creating log dir {}", self.log_dir.display()))?;
        }
        Ok(())
    }

    /// Директива для `EnvFilter`: базовый уровень плюс уровни модулей,
    /// отсортированные по имени модуля.
    pub fn build_filter_directive(&self) -> String {
        let mut modules: Vec<_> = self.module_levels.iter().collect();
        modules.sort();

        let mut directive = self.level.clone();
        for (module, level) in modules {
            directive.push(',');
            directive.push_str(module);
            directive.push('=');
            directive.push_str(level);
        }
        directive
    }

    pub fn console_format(&self) -> LogFormat {
        self.console.format.unwrap_or(self.format)
    }
}

fn is_known_level(level: &str) -> bool {
    KNOWN_LEVELS.contains(&level.to_lowercase().as_str())
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: None,
            with_ansi: true,
            with_target: true,
            with_thread_ids: true,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "syncra.log".to_string(),
            rotation: RotationPolicy::default(),
            format: LogFormat::Json,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            module_levels: HashMap::new(),
            format: LogFormat::default(),
            log_dir: PathBuf::from("logs"),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
