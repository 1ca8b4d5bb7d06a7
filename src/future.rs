use std::sync::Arc;

use syncra_error::{SyncError, SyncResult};

use crate::sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

/// Ячейка с однократной записью, читатели которой ждут значения.
pub struct FutureHolder<T> {
    monitor: Arc<Monitor<Option<T>>>,
}

impl<T: Clone + Send + 'static> FutureHolder<T> {
    pub fn new() -> Self {
        Self {
            monitor: Monitor::new(None),
        }
    }

    /// Записывает значение и будит всех читателей.
    ///
    /// Повторная запись даёт [`SyncError::ValueAlreadySet`].
    pub fn set(
        &self,
        value: T,
    ) -> SyncResult<()> {
        let mut slot = self.monitor.lock();
        if slot.is_some() {
            return Err(SyncError::ValueAlreadySet);
        }
        *slot = Some(value);
        self.monitor.notify_all();
        Ok(())
    }

    /// Ждёт значения не дольше `timeout`.
    ///
    /// `Ok(None)` при истечении таймаута. Если значение записано одновременно
    /// с отменой, возвращается значение.
    pub fn get(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<T>> {
        let deadline = Deadline::new(timeout);
        let mut slot = self.monitor.lock();
        match self
            .monitor
            .wait_until(&mut slot, &deadline, cancel, |slot| slot.is_some())
        {
            WaitOutcome::Ready => Ok(slot.clone()),
            WaitOutcome::TimedOut => Ok(None),
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }

    pub fn try_get(&self) -> Option<T> {
        self.monitor.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.monitor.lock().is_some()
    }
}

impl<T: Clone + Send + 'static> Default for FutureHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for FutureHolder<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FutureHolder")
            .field("is_set", &self.is_set())
            .finish()
    }
}
