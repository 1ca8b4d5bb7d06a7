//! Потоковые синхронизаторы на модели «замок + условная переменная».
//!
//! Каждая блокирующая операция принимает таймаут ([`Timeout`]) и токен
//! отмены ([`CancellationToken`]). Истечение таймаута ошибкой не считается:
//! операции возвращают пустой `Option` или `false`. Отмена возвращает
//! [`SyncError::Cancelled`], кроме случая, когда передача уже состоялась.

/// Settings loading: defaults, optional file, `SYNCRA__*` environment.
pub mod config;
/// Auto-reset event with FIFO hand-off.
pub mod event;
/// Thread-pool executor with hand-off and keep-alive.
pub mod executor;
/// Keyed pairwise exchanger.
pub mod exchanger;
/// Single-assignment value cell with blocking readers.
pub mod future;
/// Lazily computed value with a time-to-live.
pub mod lazy;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Typed event bus with backpressure and draining shutdown.
pub mod pubsub;
/// Message queue with cancellable delivery.
pub mod queue;
/// Timeouts, deadlines, cancellation and the shared wait loop.
pub mod sync;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use config::{EventBusSettings, ExecutorSettings, Settings};
pub use event::AutoResetEvent;
pub use exchanger::KeyedExchanger;
pub use executor::{ExecutorState, ThreadPoolExecutor};
pub use future::FutureHolder;
pub use lazy::ExpirableLazy;
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use pubsub::{BusState, BusStats, EventBus, HandlerState};
pub use queue::{MessageQueue, SendHandle, SendState};
pub use sync::{CancellationToken, Deadline, Timeout};
/// Error types.
pub use syncra_error::{StackError, StackResult, StatusCode, SyncError, SyncResult};
