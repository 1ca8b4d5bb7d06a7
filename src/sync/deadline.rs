use std::time::{Duration, Instant};

/// Таймаут блокирующей операции.
///
/// - [`Timeout::Infinite`]: ждать до сигнала или отмены;
/// - [`Timeout::ZERO`]: попытаться один раз, не блокируясь;
/// - любой другой `Bounded`: ждать не дольше указанного времени.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    Infinite,
    Bounded(Duration),
}

/// Момент окончания ожидания, вычисленный из [`Timeout`].
///
/// Создаётся один раз на блокирующий вызов и опрашивается на каждой итерации
/// цикла ожидания. Использует только монотонные часы (`Instant`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expiry: Option<Instant>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Timeout {
    pub const ZERO: Timeout = Timeout::Bounded(Duration::ZERO);

    pub const fn from_millis(ms: u64) -> Self {
        Timeout::Bounded(Duration::from_millis(ms))
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }

    /// `true` для нулевого таймаута: операция не должна блокироваться.
    pub fn is_zero(&self) -> bool {
        matches!(self, Timeout::Bounded(d) if d.is_zero())
    }
}

impl Deadline {
    pub fn new(timeout: impl Into<Timeout>) -> Self {
        let expiry = match timeout.into() {
            Timeout::Infinite => None,
            // Переполнение `Instant` трактуем как бесконечное ожидание.
            Timeout::Bounded(d) => Instant::now().checked_add(d),
        };
        Self { expiry }
    }

    /// Дедлайн, который никогда не наступает.
    pub fn never() -> Self {
        Self { expiry: None }
    }

    /// Момент истечения или `None` для бесконечного ожидания.
    pub fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    pub fn is_bounded(&self) -> bool {
        self.expiry.is_some()
    }

    /// Оставшееся время ожидания.
    ///
    /// `None` означает бесконечность; ограниченное значение никогда не бывает
    /// отрицательным (обрезается до нуля).
    pub fn remaining(&self) -> Option<Duration> {
        self.expiry
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Bounded(d)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        match d {
            Some(d) => Timeout::Bounded(d),
            None => Timeout::Infinite,
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Infinite
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
