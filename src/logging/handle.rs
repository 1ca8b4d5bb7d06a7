use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Instant,
};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard файлового writer'а: пока handle жив, фоновый поток
/// `tracing-appender` принимает события.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    shutdown_in_progress: AtomicBool,
}

/// Статистика логирования.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingStats {
    pub file_enabled: bool,
    pub shutdown_in_progress: bool,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            shutdown_in_progress: AtomicBool::new(false),
        }
    }

    /// Завершает логирование: дописывает файловый буфер и отпускает guard.
    pub fn shutdown(mut self) {
        self.shutdown_in_progress.store(true, Ordering::Release);
        tracing::info!(
            file_enabled = self.file_guard.is_some(),
            "Initiating logging shutdown"
        );

        let start = Instant::now();
        drop(self.file_guard.take());
        eprintln!(
            "Logging shutdown completed in {}ms",
            start.elapsed().as_millis()
        );
    }

    pub fn stats(&self) -> LoggingStats {
        LoggingStats {
            file_enabled: self.file_guard.is_some(),
            shutdown_in_progress: self.is_shutdown_in_progress(),
        }
    }

    pub fn is_shutdown_in_progress(&self) -> bool {
        self.shutdown_in_progress.load(Ordering::Acquire)
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if !self.is_shutdown_in_progress() && self.file_guard.is_some() {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Call .shutdown() for graceful cleanup."
            );
        }
    }
}
