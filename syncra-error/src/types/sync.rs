use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки блокирующих синхронизаторов.
///
/// Истечение таймаута ошибкой не является: операции возвращают пустой
/// `Option` или `false`. Здесь только отмена ожидания и нарушения протокола
/// использования, которые вызывающий код должен исправить сам.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Токен отмены сработал, пока поток был заблокирован.
    #[error("blocking operation was cancelled")]
    Cancelled,

    /// Третий поток обратился к уже разрешённому слоту обмена.
    #[error("exchange slot for this key is already resolved")]
    SlotAlreadyResolved,

    /// Для типа сообщения уже зарегистрирован обработчик.
    #[error("a handler for message type `{type_name}` is already registered")]
    HandlerAlreadyRegistered { type_name: &'static str },

    /// Шина событий уже не принимает сообщения и подписки.
    #[error("event bus is not active (state: {state})")]
    BusNotActive { state: &'static str },

    /// Повторный вызов shutdown.
    #[error("shutdown has already been requested")]
    AlreadyShutDown,

    /// Пул потоков отклонил команду.
    #[error("command rejected: executor is shutting down")]
    Rejected,

    /// Значение одноразовой ячейки уже установлено.
    #[error("value has already been set")]
    ValueAlreadySet,

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Функция вычисления ленивого значения вернула ошибку или паниковала.
    #[error("value provider failed: {reason}")]
    ProviderFailed { reason: String },

    /// ОС не смогла создать рабочий поток.
    #[error("failed to spawn worker thread: {reason}")]
    WorkerSpawn { reason: String },
}

impl SyncError {
    /// `true` для ошибки отмены ожидания.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// `true` для нарушений протокола использования синхронизатора.
    pub fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::SlotAlreadyResolved
                | Self::HandlerAlreadyRegistered { .. }
                | Self::BusNotActive { .. }
                | Self::AlreadyShutDown
                | Self::Rejected
                | Self::ValueAlreadySet
        )
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl ErrorExt for SyncError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::Cancelled,
            Self::SlotAlreadyResolved => StatusCode::InvalidState,
            Self::HandlerAlreadyRegistered { .. } => StatusCode::AlreadyExists,
            Self::BusNotActive { .. } | Self::AlreadyShutDown => StatusCode::NotActive,
            Self::Rejected => StatusCode::Rejected,
            Self::ValueAlreadySet => StatusCode::AlreadySet,
            Self::InvalidArgument { .. } => StatusCode::InvalidArgs,
            Self::ProviderFailed { .. } => StatusCode::ProviderFailed,
            Self::WorkerSpawn { .. } => StatusCode::ResourceExhausted,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
