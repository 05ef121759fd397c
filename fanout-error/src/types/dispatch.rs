use thiserror::Error;

use crate::{ErrorKind, StatusCode};

/// Ошибки жизненного цикла и входной очереди диспетчера.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Повторный вызов `start()`.
    #[error("dispatcher is already started")]
    AlreadyStarted,

    /// `stop()` до `start()`.
    #[error("dispatcher is not started")]
    NotStarted,

    /// Повторный `stop()` или `start()` после остановки.
    #[error("dispatcher is already stopped")]
    AlreadyStopped,

    /// `start()` вне tokio runtime.
    #[error("no tokio runtime available to spawn the dispatch loop")]
    NoRuntime,

    /// Входная очередь заполнена (только неблокирующая постановка).
    #[error("ingress queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// Цикл диспетчеризации завершён, очередь закрыта.
    #[error("ingress queue is closed")]
    Closed,
}

impl ErrorKind for DispatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AlreadyStarted | Self::NotStarted | Self::AlreadyStopped => {
                StatusCode::InvalidState
            }
            Self::NoRuntime => StatusCode::RuntimeUnavailable,
            Self::QueueFull { .. } => StatusCode::QueueFull,
            Self::Closed => StatusCode::ChannelClosed,
        }
    }
}

#[cfg(feature = "tokio")]
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DispatchError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        DispatchError::Closed
    }
}
