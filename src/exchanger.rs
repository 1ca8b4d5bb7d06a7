use std::{collections::HashMap, hash::Hash, sync::Arc};

use syncra_error::{SyncError, SyncResult};
use tracing::{debug, trace};

use crate::sync::{CancellationToken, Deadline, Monitor, Timeout, WaitOutcome};

/// Парный обменник с ключом.
///
/// Два потока, вызвавшие [`KeyedExchanger::exchange`] с одинаковым ключом,
/// встречаются и обмениваются данными. Первый пришедший (создатель) ставит
/// слот и ждёт; второй (партнёр) забирает данные создателя, оставляет свои и
/// возвращается не блокируясь. Обмен строго парный: третий поток, пришедший
/// к уже разрешённому слоту, получает [`SyncError::SlotAlreadyResolved`].
pub struct KeyedExchanger<K, T> {
    monitor: Arc<Monitor<HashMap<K, Slot<T>>>>,
}

/// Слот обмена: данные создателя, после встречи данные партнёра.
struct Slot<T> {
    payload: T,
    delivered: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, T> KeyedExchanger<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            monitor: Monitor::new(HashMap::new()),
        }
    }

    /// Обменивает `payload` на данные партнёра с тем же `key`.
    ///
    /// # Возвращает
    /// - `Ok(Some(other))`: обмен состоялся;
    /// - `Ok(None)`: партнёр не пришёл до истечения `timeout`
    ///   (с нулевым таймаутом слот даже не ставится);
    /// - `Err(SyncError::Cancelled)`: токен сработал во время ожидания;
    /// - `Err(SyncError::SlotAlreadyResolved)`: обмен по ключу уже
    ///   состоялся, но создатель ещё не забрал результат.
    pub fn exchange(
        &self,
        key: K,
        payload: T,
        timeout: impl Into<Timeout>,
        cancel: &CancellationToken,
    ) -> SyncResult<Option<T>> {
        let timeout = timeout.into();
        let mut slots = self.monitor.lock();

        let payload = match rendezvous(&mut slots, &key, payload) {
            Rendezvous::Matched(received) => {
                self.monitor.notify_all();
                trace!("exchange matched a waiting partner");
                return Ok(Some(received));
            }
            Rendezvous::Resolved => return Err(SyncError::SlotAlreadyResolved),
            Rendezvous::Vacant(payload) => payload,
        };

        if timeout.is_zero() {
            return Ok(None);
        }

        slots.insert(
            key.clone(),
            Slot {
                payload,
                delivered: false,
            },
        );

        let outcome =
            self.monitor
                .wait_until(&mut slots, &Deadline::new(timeout), cancel, |slots| {
                    slots.get(&key).is_some_and(|slot| slot.delivered)
                });

        // Слот снимает только его создатель, на любом пути выхода.
        let slot = slots.remove(&key);

        match outcome {
            WaitOutcome::Ready => Ok(slot.map(|slot| slot.payload)),
            WaitOutcome::TimedOut => {
                debug!("exchange timed out without a partner");
                Ok(None)
            }
            WaitOutcome::Cancelled => Err(SyncError::Cancelled),
        }
    }

    /// Количество слотов, ожидающих партнёра.
    pub fn pending(&self) -> usize {
        self.monitor
            .lock()
            .values()
            .filter(|slot| !slot.delivered)
            .count()
    }
}

/// Итог попытки встретиться с уже ждущим создателем.
enum Rendezvous<T> {
    /// Данные создателя; свои оставлены в слоте.
    Matched(T),
    /// Слот уже разрешён и ждёт, пока создатель его заберёт.
    Resolved,
    /// Слота нет, данные возвращаются вызывающему.
    Vacant(T),
}

/// Сторона партнёра: меняет данные в слоте создателя. Будить создателя
/// должен вызывающий.
fn rendezvous<K: Eq + Hash, T>(
    slots: &mut HashMap<K, Slot<T>>,
    key: &K,
    payload: T,
) -> Rendezvous<T> {
    match slots.get_mut(key) {
        Some(slot) if slot.delivered => Rendezvous::Resolved,
        Some(slot) => {
            slot.delivered = true;
            Rendezvous::Matched(std::mem::replace(&mut slot.payload, payload))
        }
        None => Rendezvous::Vacant(payload),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<K, T> Default for KeyedExchanger<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> std::fmt::Debug for KeyedExchanger<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + 'static,
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("KeyedExchanger")
            .field("pending", &self.pending())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
