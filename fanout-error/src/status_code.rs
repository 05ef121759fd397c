use std::fmt;

use strum_macros::IntoStaticStr;

/// Коды статуса ошибок диспетчера.
///
/// # Диапазоны:
/// - 2xxx: жизненный цикл диспетчера
/// - 4xxx: ёмкость очередей и каналов
/// - 6xxx: каналы доставки
/// - 7xxx: логирование
/// - 9xxx: настройки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[repr(u32)]
pub enum StatusCode {
    // === 2xxx: Жизненный цикл ===
    /// `start`/`stop` вызваны не в той фазе
    InvalidState = 2000,
    /// Нет tokio runtime для фонового цикла
    RuntimeUnavailable = 2001,

    // === 4xxx: Ёмкость ===
    QueueFull = 4000,
    ChannelEmpty = 4001,

    // === 6xxx: Каналы ===
    ChannelClosed = 6000,
    Timeout = 6001,

    // === 7xxx: Логирование ===
    LoggingInit = 7000,
    LogSinkIo = 7001,

    // === 9xxx: Настройки ===
    InvalidConfig = 9000,
    ConfigLoadFailed = 9001,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Уровень логирования: ошибки вызывающей стороны тише, отказы
    /// окружения громче.
    pub fn log_level(self) -> LogLevel {
        match self {
            Self::ChannelEmpty => LogLevel::Debug,
            Self::InvalidState | Self::InvalidConfig => LogLevel::Info,
            Self::QueueFull | Self::ChannelClosed | Self::Timeout => LogLevel::Warn,
            Self::RuntimeUnavailable
            | Self::LoggingInit
            | Self::LogSinkIo
            | Self::ConfigLoadFailed => LogLevel::Error,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{name}({})", self.code())
    }
}
