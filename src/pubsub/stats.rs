use std::sync::atomic::{AtomicU64, Ordering};

/// Снимок статистики шины событий.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Успешные вызовы `publish`, включая сообщения без обработчика.
    pub published: u64,
    /// Сообщения, обработанные обработчиком без паники.
    pub delivered: u64,
    /// Сообщения, отброшенные из-за переполнения или при отмене подписки.
    pub dropped: u64,
    /// Паники внутри обработчиков.
    pub handler_failures: u64,
}

/// Счётчики, которые обновляются без замка шины.
#[derive(Debug, Default)]
pub(crate) struct BusCounters {
    pub(crate) published: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) handler_failures: AtomicU64,
}

impl BusCounters {
    pub(crate) fn snapshot(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}
