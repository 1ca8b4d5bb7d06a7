use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::Arc,
};

use syncra_error::{SyncError, SyncResult};
use tracing::{debug, trace};

use crate::sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

/// Событие с автоматическим сбросом.
///
/// `signal` освобождает самого давнего ожидающего (FIFO) или, если никто не
/// ждёт, оставляет событие сигнальным до первого `wait`. Освобождение
/// передаётся конкретному ожидающему под замком, поэтому поток, пришедший
/// позже, не может перехватить сигнал.
pub struct AutoResetEvent {
    monitor: Arc<Monitor<EventState>>,
}

struct EventState {
    /// Сигнал без ожидающих. Пока он поднят, очередь пуста.
    signaled: bool,
    waiters: VecDeque<u64>,
    released: HashSet<u64>,
    next_waiter: u64,
}

impl AutoResetEvent {
    pub fn new(signaled: bool) -> Self {
        Self {
            monitor: Monitor::new(EventState {
                signaled,
                waiters: VecDeque::new(),
                released: HashSet::new(),
                next_waiter: 0,
            }),
        }
    }

    /// Ждёт сигнала не дольше `timeout`.
    ///
    /// Сигнальное событие сбрасывается и вызов сразу возвращает `true`.
    /// `Ok(false)` при истечении таймаута. Если освобождение пришло
    /// одновременно с отменой, возвращается `true`.
    pub fn wait(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<bool> {
        let timeout = timeout.into();
        let mut state = self.monitor.lock();

        if state.signaled {
            state.signaled = false;
            return Ok(true);
        }
        if timeout.is_zero() {
            return Ok(false);
        }

        let id = state.next_waiter;
        state.next_waiter += 1;
        state.waiters.push_back(id);

        let outcome = self
            .monitor
            .wait_until(&mut state, &Deadline::new(timeout), cancel, |state| {
                state.released.contains(&id)
            });

        if state.released.remove(&id) {
            return Ok(true);
        }
        state.waiters.retain(|w| *w != id);

        match outcome {
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
            WaitOutcome::Ready | WaitOutcome::TimedOut => {
                debug!(waiter = id, "event wait timed out");
                Ok(false)
            }
        }
    }

    /// Освобождает самого давнего ожидающего или поднимает сигнал.
    pub fn signal(&self) {
        let mut state = self.monitor.lock();
        match state.waiters.pop_front() {
            Some(id) => {
                state.released.insert(id);
                self.monitor.notify_all();
                trace!(waiter = id, "event handed to waiter");
            }
            None => state.signaled = true,
        }
    }

    /// Освобождает всех текущих ожидающих, не поднимая сигнал.
    ///
    /// Возвращает число освобождённых. На сигнальное событие не влияет.
    pub fn pulse_all(&self) -> usize {
        let mut state = self.monitor.lock();
        if state.signaled || state.waiters.is_empty() {
            return 0;
        }
        let state = &mut *state;
        let released = state.waiters.len();
        state.released.extend(state.waiters.drain(..));
        self.monitor.notify_all();
        trace!(released, "event pulsed");
        released
    }

    pub fn is_signaled(&self) -> bool {
        self.monitor.lock().signaled
    }

    /// Число потоков в очереди ожидания.
    pub fn waiting(&self) -> usize {
        self.monitor.lock().waiters.len()
    }
}

impl Default for AutoResetEvent {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for AutoResetEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("AutoResetEvent")
            .field("signaled", &state.signaled)
            .field("waiting", &state.waiters.len())
            .finish()
    }
}
