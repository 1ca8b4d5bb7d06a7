use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Weak,
};

use parking_lot::Mutex;

/// Объект, который нужно разбудить при срабатывании токена отмены.
///
/// Реализация обязана взять свой внутренний замок перед уведомлением
/// условной переменной, иначе пробуждение может потеряться.
pub(crate) trait Wake: Send + Sync {
    fn wake(&self);
}

/// Кооперативный сигнал отмены блокирующих вызовов.
///
/// Токен передаётся в каждую блокирующую операцию. Клоны разделяют один и
/// тот же сигнал: отмена через любой клон видна всем. Сигнал односторонний и
/// не сбрасывается.
///
/// `cancel()` нельзя вызывать, удерживая внутренний замок синхронизатора;
/// пользовательский код такого замка никогда не держит.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    waiters: Mutex<Vec<(u64, Weak<dyn Wake>)>>,
}

/// Регистрация ожидающего монитора; снимается при drop.
pub(crate) struct CancelRegistration<'a> {
    token: &'a CancellationToken,
    id: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Взводит сигнал и будит все заблокированные на нём вызовы.
    ///
    /// Повторный вызов ничего не делает.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        // Список забираем целиком и отпускаем замок токена до пробуждения:
        // `wake()` берёт замок синхронизатора.
        let waiters = std::mem::take(&mut *self.inner.waiters.lock());

        tracing::trace!(waiters = waiters.len(), "cancellation requested");

        for (_, waiter) in waiters {
            if let Some(waiter) = waiter.upgrade() {
                waiter.wake();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Регистрирует монитор для пробуждения при отмене.
    ///
    /// Вызывать до проверки `is_cancelled()`: тогда либо проверка увидит
    /// взведённый флаг, либо `cancel()` увидит регистрацию.
    pub(crate) fn register(
        &self,
        waiter: Weak<dyn Wake>,
    ) -> CancelRegistration<'_> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.waiters.lock().push((id, waiter));
        CancelRegistration { token: self, id }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.waiters.lock().len()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Debug for CancellationToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Drop for CancelRegistration<'_> {
    fn drop(&mut self) {
        let mut waiters = self.token.inner.waiters.lock();
        if let Some(pos) = waiters.iter().position(|(id, _)| *id == self.id) {
            waiters.swap_remove(pos);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Тест проверяет, что клоны разделяют один сигнал.
    #[test]
    fn test_clones_share_signal() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    /// Тест проверяет, что зарегистрированный waker будится ровно один раз,
    /// даже при повторной отмене.
    #[test]
    fn test_cancel_wakes_registered_once() {
        let token = CancellationToken::new();
        let waker = Arc::new(CountingWaker::default());
        let as_dyn: Arc<dyn Wake> = waker.clone();

        let _reg = token.register(Arc::downgrade(&as_dyn));
        token.cancel();
        token.cancel();

        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    /// Тест проверяет, что регистрация снимается при drop и отменённый
    /// вызов никого не будит.
    #[test]
    fn test_registration_removed_on_drop() {
        let token = CancellationToken::new();
        let waker = Arc::new(CountingWaker::default());
        let as_dyn: Arc<dyn Wake> = waker.clone();

        {
            let _reg = token.register(Arc::downgrade(&as_dyn));
            assert_eq!(token.registered(), 1);
        }
        assert_eq!(token.registered(), 0);

        token.cancel();
        assert_eq!(waker.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_waker_is_skipped() {
        let token = CancellationToken::new();
        let as_dyn: Arc<dyn Wake> = Arc::new(CountingWaker::default());
        let _reg = token.register(Arc::downgrade(&as_dyn));
        drop(as_dyn);

        // Не паникует на мёртвой ссылке.
        token.cancel();
        assert!(token.is_cancelled());
    }
}
