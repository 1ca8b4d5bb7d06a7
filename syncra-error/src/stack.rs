use std::{error::Error, fmt, panic::Location};

use crate::{ErrorExt, StatusCode};

/// Ошибка с цепочкой контекстов.
///
/// Контексты дописываются по мере подъёма по стеку вызовов, поэтому
/// последний из них самый внешний.
pub struct StackError {
    root: Box<dyn ErrorExt>,
    frames: Vec<Frame>,
}

/// Один контекст: сообщение и место, где его добавили.
#[derive(Debug, Clone)]
pub struct Frame {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl StackError {
    pub fn new(root: impl ErrorExt) -> Self {
        Self {
            root: Box::new(root),
            frames: Vec::new(),
        }
    }

    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.frames.push(Frame {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    /// Контексты от внутреннего к внешнему.
    pub fn contexts(&self) -> &[Frame] {
        &self.frames
    }
}

impl fmt::Display for StackError {
    /// `внешний: ...: внутренний: корень`.
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for frame in self.frames.iter().rev() {
            write!(f, "{}: ", frame.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "{} [{}]", self.root, self.status_code())?;
        for frame in self.frames.iter().rev() {
            writeln!(
                f,
                "  at {} ({}:{})",
                frame.message,
                frame.location.file(),
                frame.location.line()
            )?;
        }
        Ok(())
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.root)
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(err: E) -> Self {
        Self::new(err)
    }
}
