/// Загрузка настроек: значения по умолчанию, файл, окружение `FANOUT_*`.
pub mod config;
/// Диспетчер сообщений: входная очередь, индекс подписок, цикл доставки.
pub mod dispatch;
/// Логирование (форматы, фильтры, sinks).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{DeliveryPolicy, DispatcherSettings, Settings};
/// Dispatcher API.
pub use dispatch::{
    DeliveryMode, DeliveryOutcome, DispatchStats, Dispatcher, DispatcherConfig,
    DispatcherMetrics, Envelope, Message, MessageType, Phase, Subscriber, SubscriberId,
    SubscriberOptions, SubscriberRegistry, Subscription,
};
/// Operation errors and result types.
pub use fanout_error::{
    DispatchError, FanoutResult, LoggingError, RecvError, SettingsError, StackError, StatusCode,
    TryRecvError,
};
/// Logging setup.
pub use logging::{init_logging, log_error, LoggingConfig, LoggingHandle};
