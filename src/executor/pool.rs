use std::{
    collections::VecDeque,
    fmt,
    sync::Arc,
    thread,
    time::Duration,
};

use syncra_error::{ResultExt, StackResult, SyncError, SyncResult};
use tracing::{debug, info};

use super::worker;
use crate::{
    config::ExecutorSettings,
    sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome},
};

/// Команда, выполняемая рабочим потоком.
pub type Command = Box<dyn FnOnce() + Send + 'static>;

/// Состояние пула.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    Active,
    ShuttingDown,
    Terminated,
}

/// Ограниченный пул рабочих потоков с передачей команд из рук в руки.
///
/// `execute` отдаёт команду свободному рабочему, при необходимости создаёт
/// новый поток (не больше `max_pool_size`), а если пул занят полностью,
/// ждёт освобождения рабочего в порядке FIFO. Рабочий, простоявший без
/// работы дольше `keep_alive`, завершается.
pub struct ThreadPoolExecutor {
    shared: Arc<Shared>,
}

pub(super) struct Shared {
    pub(super) monitor: Arc<Monitor<PoolState>>,
    pub(super) keep_alive: Duration,
    /// Токен, который никогда не срабатывает: рабочих будит смена состояния.
    pub(super) never: CancellationToken,
    max_pool_size: usize,
}

pub(super) struct PoolState {
    pub(super) state: ExecutorState,
    pub(super) workers: usize,
    /// Свободные рабочие, за вычетом уже переданных им команд.
    pub(super) idle: usize,
    /// Команды, переданные свободным рабочим, но ещё не взятые ими.
    pub(super) ready: VecDeque<Command>,
    /// Отправители, ждущие свободного рабочего.
    pub(super) waiting: VecDeque<Submission>,
    next_submission: u64,
    next_worker: usize,
}

pub(super) struct Submission {
    id: u64,
    pub(super) command: Command,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ExecutorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorState::Active => "Active",
            ExecutorState::ShuttingDown => "ShuttingDown",
            ExecutorState::Terminated => "Terminated",
        }
    }
}

impl PoolState {
    fn is_waiting(
        &self,
        id: u64,
    ) -> bool {
        self.waiting.iter().any(|s| s.id == id)
    }

    fn withdraw(
        &mut self,
        id: u64,
    ) {
        self.waiting.retain(|s| s.id != id);
    }
}

impl ThreadPoolExecutor {
    /// Создаёт пул не более чем из `max_pool_size` рабочих.
    ///
    /// Потоки создаются лениво, при отправке команд.
    pub fn new(
        max_pool_size: usize,
        keep_alive: Duration,
    ) -> SyncResult<Self> {
        if max_pool_size == 0 {
            return Err(SyncError::invalid_argument("max_pool_size must be at least 1"));
        }
        Ok(Self {
            shared: Arc::new(Shared {
                monitor: Monitor::new(PoolState {
                    state: ExecutorState::Active,
                    workers: 0,
                    idle: 0,
                    ready: VecDeque::new(),
                    waiting: VecDeque::new(),
                    next_submission: 0,
                    next_worker: 0,
                }),
                keep_alive,
                never: CancellationToken::new(),
                max_pool_size,
            }),
        })
    }

    pub fn from_settings(settings: &ExecutorSettings) -> StackResult<Self> {
        Self::new(
            settings.max_pool_size,
            Duration::from_millis(settings.keep_alive_ms),
        )
        .context("building executor from settings")
    }

    /// Передаёт команду рабочему потоку.
    ///
    /// # Возвращает
    /// - `Ok(true)`: команда передана рабочему;
    /// - `Ok(false)`: за `timeout` не освободился ни один рабочий, команда
    ///   отозвана;
    /// - `Err(SyncError::Rejected)`: пул останавливается (в том числе если
    ///   остановка началась, пока команда ждала);
    /// - `Err(SyncError::Cancelled)`: токен сработал раньше, чем команду
    ///   забрали;
    /// - `Err(SyncError::WorkerSpawn)`: ОС не создала поток.
    pub fn execute<F>(
        &self,
        command: F,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        let timeout = timeout.into();
        let command: Command = Box::new(command);
        let monitor = &self.shared.monitor;
        let mut state = monitor.lock();

        if state.state != ExecutorState::Active {
            return Err(SyncError::Rejected);
        }

        if state.idle > 0 {
            state.idle -= 1;
            state.ready.push_back(command);
            monitor.notify_all();
            return Ok(true);
        }

        if state.workers < self.shared.max_pool_size {
            let id = state.next_worker;
            state.next_worker += 1;
            state.workers += 1;

            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("syncra-worker-{id}"))
                .spawn(move || worker::run(shared, command));

            return match spawned {
                Ok(_) => {
                    debug!(worker = id, workers = state.workers, "worker spawned");
                    Ok(true)
                }
                Err(e) => {
                    state.workers -= 1;
                    Err(SyncError::WorkerSpawn {
                        reason: e.to_string(),
                    })
                }
            };
        }

        if timeout.is_zero() {
            return Ok(false);
        }

        let id = state.next_submission;
        state.next_submission += 1;
        state.waiting.push_back(Submission { id, command });

        let outcome = monitor.wait_until(&mut state, &Deadline::new(timeout), cancel, |state| {
            !state.is_waiting(id) || state.state != ExecutorState::Active
        });

        if !state.is_waiting(id) {
            // Рабочий уже забрал команду.
            return Ok(true);
        }
        state.withdraw(id);

        match outcome {
            WaitOutcome::Ready => Err(SyncError::Rejected),
            WaitOutcome::TimedOut => {
                debug!(submission = id, "no worker became available in time");
                Ok(false)
            }
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }

    /// Переводит пул в режим остановки и сразу возвращается.
    ///
    /// Уже переданные команды будут выполнены; новые отклоняются.
    pub fn shutdown(&self) -> SyncResult<()> {
        let mut state = self.shared.monitor.lock();
        if state.state != ExecutorState::Active {
            return Err(SyncError::AlreadyShutDown);
        }

        state.state = if state.workers == 0 {
            ExecutorState::Terminated
        } else {
            ExecutorState::ShuttingDown
        };
        self.shared.monitor.notify_all();
        info!(workers = state.workers, "executor shutting down");
        Ok(())
    }

    /// Ждёт завершения всех рабочих после `shutdown`.
    pub fn await_termination(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<bool> {
        let deadline = Deadline::new(timeout);
        let monitor = &self.shared.monitor;
        let mut state = monitor.lock();
        match monitor.wait_until(&mut state, &deadline, cancel, |state| {
            state.state == ExecutorState::Terminated
        }) {
            WaitOutcome::Ready => Ok(true),
            WaitOutcome::TimedOut => Ok(false),
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.shared.monitor.lock().state
    }

    /// Текущее число рабочих потоков.
    pub fn pool_size(&self) -> usize {
        self.shared.monitor.lock().workers
    }

    pub fn idle_workers(&self) -> usize {
        self.shared.monitor.lock().idle
    }

    pub fn max_pool_size(&self) -> usize {
        self.shared.max_pool_size
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for ExecutorState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.shared.monitor.lock();
        f.debug_struct("ThreadPoolExecutor")
            .field("state", &state.state)
            .field("workers", &state.workers)
            .field("idle", &state.idle)
            .field("max_pool_size", &self.shared.max_pool_size)
            .finish()
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        // Рабочие держат только `Shared`; без остановки простаивающие
        // дожидались бы `keep_alive`.
        let _ = self.shutdown();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
