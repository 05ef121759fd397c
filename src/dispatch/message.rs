use std::{borrow::Borrow, fmt, sync::Arc};

use bytes::Bytes;

/// Идентификатор категории сообщений.
///
/// Непрозрачная строка, используется только как ключ индекса подписок.
/// Клоны делят одну аллокацию. Значение живёт, пока на него есть ссылки:
/// глобального пула имён нет.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(Arc<str>);

impl MessageType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MessageType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "MessageType({:?})", &*self.0)
    }
}

impl fmt::Display for MessageType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for MessageType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MessageType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Сообщение, которое умеет маршрутизировать диспетчер.
///
/// Диспетчер никогда не изменяет сообщение: каждый заинтересованный
/// подписчик получает собственный клон, поэтому `Clone` должен быть дешёвым.
pub trait Message: Clone + Send + Sync + 'static {
    fn message_type(&self) -> &MessageType;
}

/// Сообщение общего назначения: тип + непрозрачный payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub msg_type: MessageType,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(
        msg_type: impl Into<MessageType>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: payload.into(),
        }
    }
}

impl Message for Envelope {
    fn message_type(&self) -> &MessageType {
        &self.msg_type
    }
}
