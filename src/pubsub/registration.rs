use std::{any::Any, collections::VecDeque};

/// Состояние регистрации обработчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerState {
    /// Шина активна, обработчик принимает новые сообщения.
    Active,
    /// Шина завершается, обработчик дорабатывает свою очередь.
    Draining,
    /// Цикл обработчика завершился после остановки шины.
    Closed,
}

/// Регистрация обработчика одного типа сообщений.
pub(crate) struct Registration {
    pub(crate) type_name: &'static str,
    pub(crate) backlog: VecDeque<Box<dyn Any + Send>>,
    /// Обработчик сейчас выполняет сообщение, снятое с очереди.
    pub(crate) in_flight: bool,
    pub(crate) state: HandlerState,
}

impl Registration {
    pub(crate) fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            backlog: VecDeque::new(),
            in_flight: false,
            state: HandlerState::Active,
        }
    }

    /// Сообщения, ещё не обработанные до конца: очередь плюс выполняемое.
    pub(crate) fn pending(&self) -> usize {
        self.backlog.len() + usize::from(self.in_flight)
    }

    pub(crate) fn has_work(&self) -> bool {
        !self.backlog.is_empty()
    }
}
