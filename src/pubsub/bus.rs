use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{atomic::Ordering, Arc},
};

use parking_lot::MutexGuard;
use syncra_error::{ResultExt, StackResult, SyncError, SyncResult};
use tracing::{debug, error, info, trace, warn};

use super::{
    registration::Registration,
    stats::{BusCounters, BusStats},
    HandlerState,
};
use crate::{
    config::EventBusSettings,
    sync::{panic_message, CancellationToken, Deadline, Monitor, Timeout, WaitOutcome},
};

/// Состояние шины событий.
///
/// Переходы только вперёд: `Active → ShuttingDown → Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusState {
    Active,
    ShuttingDown,
    Terminated,
}

/// Типизированная шина событий.
///
/// Каждому типу сообщения соответствует не более одного обработчика.
/// Обработчик выполняется потоком, вызвавшим [`EventBus::subscribe`]:
/// вызов блокирует поток и обрабатывает сообщения своего типа в порядке
/// публикации, пока шина не будет остановлена.
///
/// Публикация никогда не блокирует. Если у обработчика уже `max_pending`
/// необработанных сообщений (в очереди плюс выполняемое), новое сообщение
/// отбрасывается.
///
/// [`EventBus::shutdown`] прекращает приём публикаций, дожидается, пока все
/// обработчики доработают свои очереди, и переводит шину в `Terminated`.
pub struct EventBus {
    monitor: Arc<Monitor<BusInner>>,
    max_pending: usize,
    counters: BusCounters,
}

struct BusInner {
    state: BusState,
    handlers: HashMap<TypeId, Registration>,
    /// Число потоков, находящихся в цикле `subscribe`.
    executors: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl BusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusState::Active => "Active",
            BusState::ShuttingDown => "ShuttingDown",
            BusState::Terminated => "Terminated",
        }
    }
}

impl BusInner {
    fn ensure_active(&self) -> SyncResult<()> {
        if self.state != BusState::Active {
            return Err(SyncError::BusNotActive {
                state: self.state.as_str(),
            });
        }
        Ok(())
    }
}

impl EventBus {
    /// Создаёт шину с ограничением `max_pending` сообщений на обработчик.
    ///
    /// `max_pending == 0` даёт [`SyncError::InvalidArgument`].
    pub fn new(max_pending: usize) -> SyncResult<Self> {
        if max_pending == 0 {
            return Err(SyncError::invalid_argument("max_pending must be at least 1"));
        }
        Ok(Self {
            monitor: Monitor::new(BusInner {
                state: BusState::Active,
                handlers: HashMap::new(),
                executors: 0,
            }),
            max_pending,
            counters: BusCounters::default(),
        })
    }

    /// Шина из секции `event_bus` настроек.
    pub fn from_settings(settings: &EventBusSettings) -> StackResult<Self> {
        Self::new(settings.max_pending).context("building event bus from settings")
    }

    /// Регистрирует `handler` для сообщений типа `T` и выполняет его в
    /// текущем потоке.
    ///
    /// Вызов блокирующий. Возвращает `Ok(())`, когда шина остановлена и
    /// очередь обработчика пуста. Паника внутри обработчика перехватывается,
    /// логируется и не прерывает цикл.
    ///
    /// # Ошибки
    /// - [`SyncError::BusNotActive`]: шина уже останавливается;
    /// - [`SyncError::HandlerAlreadyRegistered`]: у типа `T` уже есть
    ///   обработчик;
    /// - [`SyncError::Cancelled`]: токен сработал во время ожидания или
    ///   после очередного вызова обработчика. Регистрация снимается, а
    ///   оставшиеся в очереди сообщения отбрасываются.
    pub fn subscribe<T, F>(
        &self,
        handler: F,
        cancel: &CancellationToken,
    ) -> SyncResult<()>
    where
        T: Any + Send + 'static,
        F: FnMut(T),
    {
        let type_id = TypeId::of::<T>();
        let type_name = type_name::<T>();

        let mut inner = self.monitor.lock();
        inner.ensure_active()?;
        if inner.handlers.contains_key(&type_id) {
            return Err(SyncError::HandlerAlreadyRegistered { type_name });
        }
        inner.handlers.insert(type_id, Registration::new(type_name));
        inner.executors += 1;
        debug!(message_type = type_name, "handler subscribed");

        let result = self.run_handler::<T, F>(&mut inner, type_id, handler, cancel);

        match &result {
            Ok(()) => {
                if let Some(reg) = inner.handlers.get_mut(&type_id) {
                    reg.state = HandlerState::Closed;
                }
                debug!(message_type = type_name, "handler drained and closed");
            }
            Err(_) => {
                let discarded = inner
                    .handlers
                    .remove(&type_id)
                    .map_or(0, |reg| reg.backlog.len());
                if discarded > 0 {
                    self.counters
                        .dropped
                        .fetch_add(discarded as u64, Ordering::Relaxed);
                    warn!(
                        message_type = type_name,
                        discarded, "subscription cancelled, pending messages discarded"
                    );
                } else {
                    debug!(message_type = type_name, "subscription cancelled");
                }
            }
        }

        inner.executors -= 1;
        // Будим `shutdown` и `await_termination`.
        self.monitor.notify_all();
        result
    }

    /// Цикл обработчика: ждать работу, снять одно сообщение, выполнить его
    /// без замка шины.
    fn run_handler<T, F>(
        &self,
        inner: &mut MutexGuard<'_, BusInner>,
        type_id: TypeId,
        mut handler: F,
        cancel: &CancellationToken,
    ) -> SyncResult<()>
    where
        T: Any + Send + 'static,
        F: FnMut(T),
    {
        loop {
            let outcome =
                self.monitor
                    .wait_until(inner, &Deadline::never(), cancel, |inner| {
                        inner.state != BusState::Active
                            || inner.handlers.get(&type_id).is_some_and(Registration::has_work)
                    });
            if outcome != WaitOutcome::Ready || cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let Some(reg) = inner.handlers.get_mut(&type_id) else {
                return Ok(());
            };
            let Some(message) = reg.backlog.pop_front() else {
                // Очередь пуста, а шина уже не активна.
                return Ok(());
            };
            reg.in_flight = true;
            let type_name = reg.type_name;

            MutexGuard::unlocked(inner, || {
                self.dispatch::<T, F>(message, &mut handler, type_name)
            });

            if let Some(reg) = inner.handlers.get_mut(&type_id) {
                reg.in_flight = false;
            }

            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
        }
    }

    /// Вызывает обработчик для одного сообщения, перехватывая панику.
    fn dispatch<T, F>(
        &self,
        message: Box<dyn Any + Send>,
        handler: &mut F,
        type_name: &'static str,
    ) where
        T: Any + Send + 'static,
        F: FnMut(T),
    {
        let message = match message.downcast::<T>() {
            Ok(message) => *message,
            Err(_) => {
                error!(message_type = type_name, "message does not match handler type");
                self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                trace!(message_type = type_name, "message handled");
            }
            Err(payload) => {
                self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    message_type = type_name,
                    panic = %panic_message(payload.as_ref()),
                    "event handler panicked"
                );
            }
        }
    }

    /// Публикует сообщение. Никогда не блокирует.
    ///
    /// Без обработчика для `T` сообщение молча игнорируется; при
    /// переполнении очереди обработчика отбрасывается.
    ///
    /// # Ошибки
    /// [`SyncError::BusNotActive`] после вызова `shutdown`.
    pub fn publish<T>(
        &self,
        message: T,
    ) -> SyncResult<()>
    where
        T: Any + Send + 'static,
    {
        let mut inner = self.monitor.lock();
        inner.ensure_active()?;
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let Some(reg) = inner.handlers.get_mut(&TypeId::of::<T>()) else {
            trace!(message_type = type_name::<T>(), "no handler, message ignored");
            return Ok(());
        };

        if reg.pending() >= self.max_pending {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                message_type = reg.type_name,
                max_pending = self.max_pending,
                "handler backlog full, message dropped"
            );
            return Ok(());
        }

        reg.backlog.push_back(Box::new(message));
        self.monitor.notify_all();
        Ok(())
    }

    /// Останавливает шину и блокирует поток, пока все обработчики не
    /// доработают свои очереди.
    ///
    /// Нельзя вызывать из обработчика этой же шины: поток будет ждать сам
    /// себя.
    ///
    /// # Ошибки
    /// [`SyncError::AlreadyShutDown`] при повторном вызове.
    pub fn shutdown(&self) -> SyncResult<()> {
        let mut inner = self.monitor.lock();
        if inner.state != BusState::Active {
            return Err(SyncError::AlreadyShutDown);
        }

        inner.state = BusState::ShuttingDown;
        for reg in inner.handlers.values_mut() {
            reg.state = HandlerState::Draining;
        }
        self.monitor.notify_all();
        info!(executors = inner.executors, "event bus shutting down");

        let never = CancellationToken::new();
        self.monitor
            .wait_until(&mut inner, &Deadline::never(), &never, |inner| inner.executors == 0);

        inner.state = BusState::Terminated;
        self.monitor.notify_all();
        info!("event bus terminated");
        Ok(())
    }

    /// Ждёт перехода шины в `Terminated`.
    ///
    /// `Ok(false)` при истечении таймаута.
    pub fn await_termination(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<bool> {
        let deadline = Deadline::new(timeout);
        let mut inner = self.monitor.lock();
        match self.monitor.wait_until(&mut inner, &deadline, cancel, |inner| {
            inner.state == BusState::Terminated
        }) {
            WaitOutcome::Ready => Ok(true),
            WaitOutcome::TimedOut => Ok(false),
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }

    pub fn state(&self) -> BusState {
        self.monitor.lock().state
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// `true`, если у типа `T` есть работающий обработчик.
    pub fn is_subscribed<T: Any>(&self) -> bool {
        self.handler_state::<T>()
            .is_some_and(|state| state != HandlerState::Closed)
    }

    pub fn handler_state<T: Any>(&self) -> Option<HandlerState> {
        self.monitor
            .lock()
            .handlers
            .get(&TypeId::of::<T>())
            .map(|reg| reg.state)
    }

    /// Количество сообщений типа `T`, ожидающих в очереди обработчика.
    pub fn backlog_len<T: Any>(&self) -> usize {
        self.monitor
            .lock()
            .handlers
            .get(&TypeId::of::<T>())
            .map_or(0, |reg| reg.backlog.len())
    }

    pub fn stats(&self) -> BusStats {
        self.counters.snapshot()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for BusState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let inner = self.monitor.lock();
        f.debug_struct("EventBus")
            .field("state", &inner.state)
            .field("handlers", &inner.handlers.len())
            .field("executors", &inner.executors)
            .field("max_pending", &self.max_pending)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
