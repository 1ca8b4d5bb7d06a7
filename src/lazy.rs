use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::MutexGuard;
use syncra_error::{SyncError, SyncResult};
use tracing::{debug, trace, warn};

use crate::sync::{panic_message, CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

type Provider<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Ленивое значение с ограниченным временем жизни.
///
/// Значение вычисляется функцией `provider` в потоке первого читателя;
/// остальные читатели ждут результат. Время жизни отсчитывается от
/// момента, когда `provider` вернул значение. После истечения следующий
/// читатель вычисляет его заново.
///
/// Если `provider` вернул ошибку или паниковал, вычислявший поток получает
/// [`SyncError::ProviderFailed`], а вычисление повторяет один из ждущих
/// читателей. Число повторов не ограничено.
pub struct ExpirableLazy<T, E> {
    monitor: Arc<Monitor<LazyState<T>>>,
    provider: Provider<T, E>,
    time_to_live: Duration,
}

struct LazyState<T> {
    cached: Option<Cached<T>>,
    computing: bool,
}

struct Cached<T> {
    value: T,
    /// `None`: время жизни не помещается в `Instant`, значение вечное.
    expires_at: Option<Instant>,
}

impl<T> LazyState<T> {
    fn fresh(&self) -> Option<&T> {
        let now = Instant::now();
        self.cached
            .as_ref()
            .filter(|c| c.expires_at.map_or(true, |at| now < at))
            .map(|c| &c.value)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<T, E> ExpirableLazy<T, E>
where
    T: Clone + Send + 'static,
    E: fmt::Display,
{
    pub fn new<P>(
        provider: P,
        time_to_live: Duration,
    ) -> Self
    where
        P: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            monitor: Monitor::new(LazyState {
                cached: None,
                computing: false,
            }),
            provider: Box::new(provider),
            time_to_live,
        }
    }

    /// Возвращает актуальное значение, при необходимости вычисляя его.
    ///
    /// `timeout` ограничивает только ожидание чужого вычисления: если
    /// вычислять выпало этому потоку, `provider` выполняется до конца.
    ///
    /// # Возвращает
    /// - `Ok(Some(value))`: значение актуально;
    /// - `Ok(None)`: другой поток не успел вычислить значение за `timeout`;
    /// - `Err(SyncError::ProviderFailed)`: вычисление в этом потоке не удалось;
    /// - `Err(SyncError::Cancelled)`: токен сработал, а актуального значения
    ///   нет. Отменённый вызов не запускает `provider`.
    pub fn value(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<T>> {
        let deadline = Deadline::new(timeout);
        let mut state = self.monitor.lock();

        loop {
            if let Some(value) = state.fresh() {
                return Ok(Some(value.clone()));
            }
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            if !state.computing {
                return self.compute(&mut state).map(Some);
            }

            match self.monitor.wait_until(&mut state, &deadline, cancel, |state| {
                !state.computing || state.fresh().is_some()
            }) {
                WaitOutcome::Ready => continue,
                WaitOutcome::TimedOut => return Ok(None),
                WaitOutcome::Cancelled => return Err(SyncError::Cancelled),
            }
        }
    }

    /// Актуальное значение без вычисления и ожидания.
    pub fn peek(&self) -> Option<T> {
        self.monitor.lock().fresh().cloned()
    }

    pub fn is_computing(&self) -> bool {
        self.monitor.lock().computing
    }

    fn compute(
        &self,
        state: &mut MutexGuard<'_, LazyState<T>>,
    ) -> SyncResult<T> {
        state.computing = true;
        let result = MutexGuard::unlocked(state, || {
            panic::catch_unwind(AssertUnwindSafe(|| (self.provider)()))
        });
        state.computing = false;
        // Будим всех: при успехе они заберут значение, при ошибке первый
        // успевший возьмёт вычисление на себя.
        self.monitor.notify_all();

        match result {
            Ok(Ok(value)) => {
                state.cached = Some(Cached {
                    value: value.clone(),
                    expires_at: Instant::now().checked_add(self.time_to_live),
                });
                trace!(ttl_ms = self.time_to_live.as_millis() as u64, "lazy value computed");
                Ok(value)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "value provider failed");
                Err(SyncError::ProviderFailed {
                    reason: e.to_string(),
                })
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(panic = %reason, "value provider panicked");
                Err(SyncError::ProviderFailed { reason })
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<T: Send + 'static, E> fmt::Debug for ExpirableLazy<T, E> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("ExpirableLazy")
            .field("cached", &state.cached.is_some())
            .field("computing", &state.computing)
            .field("time_to_live", &self.time_to_live)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
