use std::{fmt, io};

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибка без собственного типа: код плюс текст.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericError {
    code: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for GenericError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GenericError {}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.code
    }
}

/// Любая ошибка ввода-вывода получает код [`StatusCode::Io`].
impl From<io::Error> for StackError {
    fn from(err: io::Error) -> Self {
        StackError::new(GenericError::new(StatusCode::Io, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResultExt;

    #[test]
    fn test_io_error_becomes_io_status() {
        let res: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = res.context("creating log dir").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Io);
        assert_eq!(err.to_string(), "creating log dir: denied");
    }
}
