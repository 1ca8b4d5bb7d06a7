use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{LoggingConfig, RotationPolicy},
    formatter,
};

/// Файловый слой с неблокирующей записью.
///
/// Guard нужно держать, пока логирование активно: при его drop фоновый
/// поток дописывает буфер и завершается.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let rotation = match config.file.rotation {
        RotationPolicy::Never => Rotation::NEVER,
        RotationPolicy::Hourly => Rotation::HOURLY,
        RotationPolicy::Daily => Rotation::DAILY,
    };
    let appender = RollingFileAppender::new(rotation, &config.log_dir, &config.file.filename);
    let (writer, guard) = non_blocking(appender);

    let layer = formatter::build_formatter(&config.console, config.file.format, writer, false);
    (layer, guard)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;

    /// Тест проверяет, что события доходят до файла после drop guard.
    #[test]
    fn test_events_flushed_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = LoggingConfig::default();
        cfg.log_dir = tmp.path().to_path_buf();
        cfg.file.enabled = true;
        cfg.file.rotation = RotationPolicy::Never;
        cfg.file.filename = "test.log".into();

        let (layer, guard) = layer_with_config::<Registry>(&cfg);
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(discarded = 3, "subscription cancelled");
        });
        drop(guard);

        let content = fs::read_to_string(tmp.path().join("test.log")).unwrap();
        assert!(content.contains("subscription cancelled"));
        assert!(content.contains("\"discarded\":3"));
    }
}
