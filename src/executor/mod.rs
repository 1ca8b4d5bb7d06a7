//! Ограниченный пул рабочих потоков.
//!
//! - `pool`: `ThreadPoolExecutor`, отправка команд и протокол остановки.
//! - `worker` (приватный): цикл рабочего потока.

pub mod pool;
mod worker;

pub use pool::{Command, ExecutorState, ThreadPoolExecutor};
