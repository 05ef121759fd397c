use thiserror::Error;

use crate::{ErrorKind, StatusCode};

/// Ошибка ожидания сообщения в канале подписчика.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecvError {
    /// Все хэндлы подписчика уничтожены, буфер пуст.
    #[error("delivery channel is closed")]
    Closed,

    /// Дедлайн `recv_timeout` истёк.
    #[error("no message within the receive deadline")]
    Timeout,
}

/// Ошибка неблокирующего получения сообщения.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no messages available")]
    Empty,

    #[error("delivery channel is closed")]
    Closed,
}

impl ErrorKind for RecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::ChannelClosed,
            Self::Timeout => StatusCode::Timeout,
        }
    }
}

impl ErrorKind for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty => StatusCode::ChannelEmpty,
            Self::Closed => StatusCode::ChannelClosed,
        }
    }
}

#[cfg(feature = "tokio")]
impl From<tokio::sync::mpsc::error::TryRecvError> for TryRecvError {
    fn from(err: tokio::sync::mpsc::error::TryRecvError) -> Self {
        match err {
            tokio::sync::mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            tokio::sync::mpsc::error::TryRecvError::Disconnected => TryRecvError::Closed,
        }
    }
}

#[cfg(feature = "tokio")]
impl From<tokio::time::error::Elapsed> for RecvError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RecvError::Timeout
    }
}
