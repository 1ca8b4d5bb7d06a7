use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use syncra_error::{SyncError, SyncResult};
use tracing::{debug, trace};

use super::handle::{SendHandle, SendState, SendTicket};
use crate::sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

/// Очередь сообщений с отменяемой доставкой.
///
/// Отправка никогда не блокирует: сообщение либо сразу отдаётся самому
/// давнему ждущему получателю, либо встаёт в очередь. Получатель забирает
/// самое старое сообщение или ждёт с таймаутом и токеном отмены. Обе стороны
/// сопоставляются в порядке FIFO.
pub struct MessageQueue<T> {
    monitor: Arc<Monitor<QueueState<T>>>,
}

/// Состояние очереди под замком.
///
/// Инвариант: `messages` и `receivers` никогда не бывают непусты
/// одновременно.
pub(crate) struct QueueState<T> {
    messages: VecDeque<Queued<T>>,
    receivers: VecDeque<u64>,
    fulfilled: HashMap<u64, T>,
    next_send: u64,
    next_receiver: u64,
}

struct Queued<T> {
    ticket: Arc<SendTicket>,
    payload: T,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<T> QueueState<T> {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            receivers: VecDeque::new(),
            fulfilled: HashMap::new(),
            next_send: 0,
            next_receiver: 0,
        }
    }

    /// Отдаёт сообщение самому давнему ждущему получателю (возвращая его
    /// номер) или ставит в очередь. Будить ждущих должен вызывающий.
    fn post(
        &mut self,
        payload: T,
    ) -> (Arc<SendTicket>, Option<u64>) {
        let id = self.next_send;
        self.next_send += 1;

        match self.receivers.pop_front() {
            Some(receiver) => {
                self.fulfilled.insert(receiver, payload);
                (SendTicket::new(id, SendState::Delivered), Some(receiver))
            }
            None => {
                let ticket = SendTicket::new(id, SendState::Queued);
                self.messages.push_back(Queued {
                    ticket: ticket.clone(),
                    payload,
                });
                (ticket, None)
            }
        }
    }

    /// Снимает сообщение с очереди и помечает его отменённым.
    ///
    /// Возвращает `false`, если сообщения в очереди уже нет.
    pub(crate) fn withdraw(
        &mut self,
        ticket: &SendTicket,
    ) -> bool {
        match self.messages.iter().position(|m| m.ticket.id == ticket.id) {
            Some(pos) => {
                self.messages.remove(pos);
                ticket.set(SendState::Cancelled);
                true
            }
            None => false,
        }
    }
}

impl<T: Send + 'static> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            monitor: Monitor::new(QueueState::new()),
        }
    }

    /// Отправляет сообщение. Никогда не блокирует.
    ///
    /// Если есть ждущий получатель, дескриптор сразу в состоянии
    /// [`SendState::Delivered`].
    pub fn send(
        &self,
        payload: T,
    ) -> SendHandle<T> {
        let mut state = self.monitor.lock();
        let (ticket, receiver) = state.post(payload);
        if let Some(receiver) = receiver {
            self.monitor.notify_all();
            trace!(send_id = ticket.id, receiver, "message handed to waiting receiver");
        }
        drop(state);

        SendHandle::new(self.monitor.clone(), ticket)
    }

    /// Забирает самое старое сообщение, при необходимости ожидая.
    ///
    /// # Возвращает
    /// - `Ok(Some(payload))`: сообщение получено;
    /// - `Ok(None)`: истёк таймаут (с нулевым таймаутом запрос на получение
    ///   не регистрируется);
    /// - `Err(SyncError::Cancelled)`: сработал токен, пока поток ждал.
    pub fn receive(
        &self,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<T>> {
        let timeout = timeout.into();
        let mut state = self.monitor.lock();

        if let Some(message) = state.messages.pop_front() {
            message.ticket.set(SendState::Delivered);
            // Будим отправителей, ждущих доставки.
            self.monitor.notify_all();
            return Ok(Some(message.payload));
        }

        if timeout.is_zero() {
            return Ok(None);
        }

        let id = state.next_receiver;
        state.next_receiver += 1;
        state.receivers.push_back(id);

        let outcome =
            self.monitor
                .wait_until(&mut state, &Deadline::new(timeout), cancel, |state| {
                    state.fulfilled.contains_key(&id)
                });

        match outcome {
            WaitOutcome::Ready => Ok(state.fulfilled.remove(&id)),
            WaitOutcome::TimedOut => {
                state.receivers.retain(|r| *r != id);
                debug!(receiver = id, "receive timed out");
                Ok(None)
            }
            WaitOutcome::Cancelled => {
                state.receivers.retain(|r| *r != id);
                Err(SyncError::Cancelled)
            }
        }
    }

    /// Количество сообщений в очереди.
    pub fn len(&self) -> usize {
        self.monitor.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Количество получателей, ожидающих сообщения.
    pub fn waiting_receivers(&self) -> usize {
        self.monitor.lock().receivers.len()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<T: Send + 'static> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for MessageQueue<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("MessageQueue")
            .field("queued", &state.messages.len())
            .field("waiting_receivers", &state.receivers.len())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
