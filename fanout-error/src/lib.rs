//! Ошибки диспетчера `fanout`.
//!
//! Каждая область (жизненный цикл диспетчера, приём сообщений, настройки,
//! логирование) объявляет свой `thiserror`-enum и сопоставляет варианты с
//! [`StatusCode`]. На границах модулей ошибки поднимаются как
//! [`StackError`] с цепочкой контекстов.

pub mod kind;
pub mod macros;
pub mod stack;
pub mod status_code;
pub mod types;

pub use kind::ErrorKind;
pub use stack::{ErrorContext, StackError};
pub use status_code::{LogLevel, StatusCode};
pub use types::*;

pub type FanoutResult<T> = Result<T, StackError>;
