use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use syncra_error::{SyncError, SyncResult};
use tracing::debug;

use super::message_queue::QueueState;
use crate::sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

/// Состояние отправленного сообщения.
///
/// Переходы односторонние: `Queued → Delivered` или `Queued → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SendState {
    /// Лежит в очереди и ждёт получателя.
    Queued = 0,
    /// Передано получателю.
    Delivered = 1,
    /// Снято с очереди отправителем или по таймауту ожидания доставки.
    Cancelled = 2,
}

/// Общая для очереди и дескриптора метка отправки.
///
/// Состояние меняется только под замком очереди, а читается без него.
pub(crate) struct SendTicket {
    pub(crate) id: u64,
    state: AtomicU8,
}

/// Дескриптор отправленного сообщения.
///
/// Позволяет узнать, доставлено ли сообщение, дождаться доставки или снять
/// сообщение с очереди, пока его никто не забрал.
pub struct SendHandle<T> {
    monitor: Arc<Monitor<QueueState<T>>>,
    ticket: Arc<SendTicket>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SendState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Queued,
            1 => Self::Delivered,
            _ => Self::Cancelled,
        }
    }
}

impl SendTicket {
    pub(crate) fn new(
        id: u64,
        state: SendState,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: AtomicU8::new(state as u8),
        })
    }

    pub(crate) fn state(&self) -> SendState {
        SendState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(
        &self,
        state: SendState,
    ) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl<T: Send + 'static> SendHandle<T> {
    pub(crate) fn new(
        monitor: Arc<Monitor<QueueState<T>>>,
        ticket: Arc<SendTicket>,
    ) -> Self {
        Self { monitor, ticket }
    }

    /// Снимок состояния без блокировки.
    pub fn state(&self) -> SendState {
        self.ticket.state()
    }

    pub fn is_delivered(&self) -> bool {
        self.state() == SendState::Delivered
    }

    /// Снимает сообщение с очереди.
    ///
    /// Успешно только пока сообщение в состоянии `Queued` и физически лежит в
    /// очереди. После успеха `is_delivered()` навсегда остаётся `false`.
    pub fn try_cancel(&self) -> bool {
        let mut state = self.monitor.lock();
        if self.ticket.state() != SendState::Queued {
            return false;
        }
        let cancelled = state.withdraw(&self.ticket);
        if cancelled {
            self.monitor.notify_all();
        }
        cancelled
    }

    /// Ждёт, пока получатель заберёт сообщение.
    ///
    /// # Возвращает
    /// - `Ok(true)`: сообщение доставлено;
    /// - `Ok(false)`: истёк таймаут (сообщение снимается с очереди, если ещё
    ///   лежит там) или сообщение уже было отменено через `try_cancel`;
    /// - `Err(SyncError::Cancelled)`: сработал токен и доставка не успела
    ///   состояться; сообщение снимается с очереди.
    pub fn await_delivery(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<bool> {
        let deadline = Deadline::new(timeout);
        let mut state = self.monitor.lock();

        let ticket = &self.ticket;
        let outcome = self.monitor.wait_until(&mut state, &deadline, cancel, |_| {
            ticket.state() != SendState::Queued
        });

        match outcome {
            WaitOutcome::Ready => Ok(ticket.state() == SendState::Delivered),
            WaitOutcome::TimedOut => {
                if state.withdraw(ticket) {
                    debug!(send_id = ticket.id, "delivery timed out, message withdrawn");
                }
                Ok(false)
            }
            WaitOutcome::Cancelled => {
                state.withdraw(ticket);
                Err(SyncError::Cancelled)
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<T> std::fmt::Debug for SendHandle<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SendHandle")
            .field("id", &self.ticket.id)
            .field("state", &self.ticket.state())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
