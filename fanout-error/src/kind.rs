use std::error::Error;

use crate::{LogLevel, StatusCode};

/// Общий интерфейс типизированных ошибок: код статуса и уровень логирования.
///
/// Всё, что реализует `ErrorKind`, превращается в [`StackError`] через `?`.
///
/// [`StackError`]: crate::StackError
pub trait ErrorKind: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;

    /// Уровень, на котором ошибку стоит логировать.
    fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }
}
