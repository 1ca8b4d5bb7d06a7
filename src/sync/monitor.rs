use std::{sync::Arc, time::Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{
    cancel::{CancellationToken, Wake},
    Deadline,
};

/// Состояние синхронизатора под единственным замком плюс условная
/// переменная.
///
/// Все синхронизаторы крейта построены на нём: один замок на экземпляр,
/// без вложенных захватов между экземплярами.
pub(crate) struct Monitor<S> {
    state: Mutex<S>,
    cond: Condvar,
}

/// Чем закончилось ожидание в [`Monitor::wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// Предикат выполнен.
    Ready,
    /// Дедлайн истёк раньше, чем выполнился предикат.
    TimedOut,
    /// Сработал токен отмены, предикат не выполнен.
    Cancelled,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<S: Send + 'static> Monitor<S> {
    pub(crate) fn new(state: S) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock()
    }

    pub(crate) fn notify_all(&self) {
        self.cond.notify_all();
    }

    /// Ограниченное ожидание: блокирует поток, пока `ready` не вернёт `true`,
    /// не истечёт `deadline` или не сработает `cancel`.
    ///
    /// Предикат перепроверяется после каждого пробуждения, ложные
    /// пробуждения допустимы. Порядок проверок: предикат, отмена, дедлайн.
    /// Поэтому уже состоявшаяся передача всегда побеждает одновременную
    /// отмену или истечение времени.
    pub(crate) fn wait_until<F>(
        self: &Arc<Self>,
        guard: &mut MutexGuard<'_, S>,
        deadline: &Deadline,
        cancel: &CancellationToken,
        mut ready: F,
    ) -> WaitOutcome
    where
        F: FnMut(&mut S) -> bool,
    {
        let waker: Arc<dyn Wake> = self.clone();
        let _registration = cancel.register(Arc::downgrade(&waker));
        drop(waker);

        loop {
            if ready(&mut **guard) {
                return WaitOutcome::Ready;
            }
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            match deadline.expiry() {
                None => self.cond.wait(guard),
                Some(at) => {
                    if Instant::now() >= at {
                        return WaitOutcome::TimedOut;
                    }
                    // Результат не важен: всё решают проверки в начале цикла.
                    let _ = self.cond.wait_until(guard, at);
                }
            }
        }
    }
}

impl<S: Send> Wake for Monitor<S> {
    fn wake(&self) {
        let _guard = self.state.lock();
        self.cond.notify_all();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
