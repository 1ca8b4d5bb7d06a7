//! Ошибки syncra.
//!
//! Два уровня:
//! - [`SyncError`]: плоский enum для операций синхронизаторов, который
//!   вызывающий код сопоставляет по вариантам;
//! - [`StackError`]: ошибка инфраструктуры (настройки, логирование) с
//!   цепочкой контекстов и статус-кодом корня.

pub mod ext;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

pub use ext::{ErrorExt, ResultExt};
pub use stack::{Frame, StackError};
pub use status_code::StatusCode;
pub use types::{GenericError, SyncError};

/// Результат загрузки настроек и инициализации логирования.
pub type StackResult<T> = Result<T, StackError>;

/// Результат операций синхронизаторов.
pub type SyncResult<T> = Result<T, SyncError>;
