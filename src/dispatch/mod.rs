//! Диспетчер сообщений publish/subscribe внутри процесса.
//!
//! Единая ограниченная входная очередь типизированных сообщений
//! разветвляется заинтересованным подписчикам по типу сообщения:
//!
//! - `message`: `MessageType`, трейт `Message` и конверт `Envelope`.
//! - `subscriber`: хэндл `Subscriber`, приёмник `Subscription`, режимы
//!   доставки.
//! - `registry`: конкурентный индекс тип → подписчики.
//! - `dispatcher`: входная очередь, фоновый цикл, `start`/`stop`.
//! - `metrics`: счётчики исходов доставки.
//! - `config`: параметры диспетчера.

pub mod config;
pub mod dispatcher;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod subscriber;

pub use config::*;
pub use dispatcher::*;
pub use message::*;
pub use metrics::*;
pub use registry::*;
pub use subscriber::*;
