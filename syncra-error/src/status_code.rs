use std::fmt;

#[cfg(feature = "extras")]
use strum_macros::{AsRefStr, EnumIter};

/// Категория ошибки.
///
/// Тысячи задают группу:
/// - 1xxx: ошибки вызывающего кода (аргументы, пользовательские функции);
/// - 2xxx: нарушение протокола использования синхронизатора;
/// - 3xxx: прерванное ожидание;
/// - 4xxx: ресурсы ОС;
/// - 5xxx: настройки.
#[cfg_attr(feature = "extras", derive(AsRefStr, EnumIter))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    InvalidArgs = 1000,
    ProviderFailed = 1001,

    InvalidState = 2000,
    AlreadyExists = 2001,
    AlreadySet = 2002,
    NotActive = 2003,
    Rejected = 2004,

    Cancelled = 3000,

    Io = 4000,
    ResourceExhausted = 4001,

    InvalidConfig = 5000,
    ConfigLoadFailed = 5001,
}

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "extras")]
        let name: &str = self.as_ref();
        #[cfg(not(feature = "extras"))]
        let name = format!("{self:?}");
        write!(f, "{name}/{}", self.code())
    }
}
