use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{ErrorKind, StatusCode};

/// Ошибки установки логирования.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Не удалось создать каталог файлового sink.
    #[error("failed to create log directory {dir:?}")]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Глобальный подписчик `tracing` уже установлен.
    #[error("failed to install tracing subscriber: {reason}")]
    Install { reason: String },
}

impl ErrorKind for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CreateDir { .. } => StatusCode::LogSinkIo,
            Self::Install { .. } => StatusCode::LoggingInit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_create_dir_keeps_source() {
        let err = LoggingError::CreateDir {
            dir: PathBuf::from("/readonly/logs"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.status_code(), StatusCode::LogSinkIo);
        assert!(err.to_string().contains("/readonly/logs"));
        assert!(err.source().is_some());
    }
}
