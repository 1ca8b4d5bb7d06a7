//! Очередь сообщений с отменяемой доставкой.
//!
//! - `message_queue`: сама очередь, FIFO-сопоставление отправителей и
//!   получателей.
//! - `handle`: дескриптор отправки для отслеживания и отмены доставки.

pub mod handle;
pub mod message_queue;

pub use handle::{SendHandle, SendState};
pub use message_queue::MessageQueue;
