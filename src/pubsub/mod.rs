//! Типизированная шина событий (publish/subscribe).
//!
//! - `bus`: сама шина, публикация, подписка и завершение с дренажом.
//! - `registration` (приватный): регистрация обработчика и его очередь.
//! - `stats`: счётчики публикаций, доставок и отброшенных сообщений.
//!
//! Публичный API переэкспортирует `bus::*`, `registration::HandlerState` и
//! `stats::BusStats`.

pub mod bus;
mod registration;
pub mod stats;

pub use bus::*;
pub use registration::HandlerState;
pub use stats::BusStats;
