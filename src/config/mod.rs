//! Настройки крейта: значения по умолчанию, необязательный файл и
//! переменные окружения `SYNCRA__*`.

pub mod settings;

pub use settings::{EventBusSettings, ExecutorSettings, Settings};
