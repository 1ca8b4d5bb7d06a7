use std::error::Error;

use crate::{StackError, StatusCode};

/// Ошибка, у которой есть статус-код.
///
/// Всё, что реализует трейт, превращается в [`StackError`] через `?`.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;
}

/// Контекст для `Result`, чья ошибка сводится к [`StackError`].
pub trait ResultExt<T> {
    /// Оборачивает ошибку и дописывает `msg` в цепочку.
    fn context(
        self,
        msg: impl Into<String>,
    ) -> Result<T, StackError>;

    /// Как [`ResultExt::context`], но строка строится только при ошибке.
    fn with_context<M, F>(
        self,
        msg: F,
    ) -> Result<T, StackError>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E: Into<StackError>> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn context(
        self,
        msg: impl Into<String>,
    ) -> Result<T, StackError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(msg)),
        }
    }

    #[track_caller]
    fn with_context<M, F>(
        self,
        msg: F,
    ) -> Result<T, StackError>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(msg())),
        }
    }
}
