//! Общие примитивы блокирующего ожидания.
//!
//! - `deadline`: таймауты и вычисление дедлайна по монотонным часам.
//! - `cancel`: кооперативный токен отмены блокирующих вызовов.
//! - `monitor` (приватный): замок + условная переменная и единый цикл
//!   ограниченного ожидания, на котором построены все синхронизаторы.
//! - `unwind` (приватный): текст перехваченной паники для логов.

pub mod cancel;
pub mod deadline;
pub(crate) mod monitor;
mod unwind;

pub use cancel::CancellationToken;
pub use deadline::{Deadline, Timeout};
pub(crate) use monitor::{Monitor, WaitOutcome};
pub(crate) use unwind::panic_message;
