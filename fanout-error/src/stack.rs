use std::{error::Error, fmt, panic::Location, sync::Arc};

use crate::{ErrorKind, LogLevel, StatusCode};

/// Ошибка, поднимающаяся по стеку вызовов.
///
/// Хранит исходную типизированную ошибку и контексты, добавленные по пути
/// наверх, вместе с местом добавления. Код статуса и уровень логирования
/// снимаются с исходной ошибки при создании.
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn Error + Send + Sync>,
    status: StatusCode,
    level: LogLevel,
    contexts: Vec<ErrorContext>,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl StackError {
    pub fn new<E: ErrorKind>(err: E) -> Self {
        Self {
            status: err.status_code(),
            level: err.log_level(),
            root: Arc::new(err),
            contexts: Vec::new(),
        }
    }

    /// Добавляет внешний контекст (например, имя загружаемого файла).
    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.contexts.push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn log_level(&self) -> LogLevel {
        self.level
    }

    /// Контексты от внутреннего к внешнему.
    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let contexts: Vec<String> = self
            .contexts
            .iter()
            .map(|ctx| format!("{} ({})", ctx.message, ctx.location))
            .collect();

        f.debug_struct("StackError")
            .field("root", &self.root.to_string())
            .field("status_code", &self.status_code())
            .field("contexts", &contexts)
            .finish()
    }
}

/// Внешний контекст первым: `loading fanout.toml: failed to load settings: ...`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for ctx in self.contexts.iter().rev() {
            write!(f, "{}: ", ctx.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.root.as_ref())
    }
}

impl<E: ErrorKind> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DispatchError, SettingsError};

    #[test]
    fn test_context_chain_display() {
        let err = StackError::from(SettingsError::Load {
            reason: "missing field".to_string(),
        })
        .context("dispatcher settings")
        .context("loading fanout.toml");

        assert_eq!(err.contexts().len(), 2);
        assert_eq!(err.contexts()[0].message, "dispatcher settings");
        assert!(err.contexts()[0].location.file().ends_with("stack.rs"));
        assert_eq!(
            err.to_string(),
            "loading fanout.toml: dispatcher settings: failed to load settings: missing field"
        );
    }

    #[test]
    fn test_status_and_level_follow_root() {
        let err = StackError::from(DispatchError::Closed).context("put_message");
        assert_eq!(err.status_code(), StatusCode::ChannelClosed);
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_source_is_root() {
        let err = StackError::from(DispatchError::NotStarted);
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("dispatcher is not started")
        );
    }
}
