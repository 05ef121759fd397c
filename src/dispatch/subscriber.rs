use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use fanout_error::{RecvError, TryRecvError};
use strum_macros::{Display, IntoStaticStr};
use tokio::sync::mpsc::{
    self,
    error::{SendTimeoutError, TrySendError},
};

use super::{Envelope, Message, MessageType, MAX_CAPACITY};

/// Ёмкость канала доставки по умолчанию.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Счётчик для генерации уникальных ID подписчиков.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Идентичность подписчика.
///
/// Два подписчика с одинаковыми интересами: разные записи в индексе;
/// все клоны одного [`Subscriber`] имеют один и тот же ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Поведение цикла диспетчеризации, когда канал подписчика заполнен.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Ждать, пока подписчик освободит место.
    ///
    /// Заполненный канал останавливает весь цикл диспетчеризации, включая
    /// доставку другим подписчикам и другим типам сообщений. Подписчик обязан
    /// вычитывать свой канал.
    #[default]
    Blocking,
    /// Не ждать: сообщение для этого подписчика отбрасывается.
    DropOnFull,
    /// Ждать не дольше заданного времени, затем отбросить.
    Timeout(Duration),
}

/// Итог попытки доставки одному подписчику.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Dropped,
    TimedOut,
    /// Приёмник подписчика уничтожен.
    Closed,
}

/// Параметры нового подписчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberOptions {
    /// Ёмкость канала доставки (минимум 1).
    pub capacity: usize,
    pub delivery: DeliveryMode,
}

impl SubscriberOptions {
    pub fn with_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_delivery(
        mut self,
        delivery: DeliveryMode,
    ) -> Self {
        self.delivery = delivery;
        self
    }
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            delivery: DeliveryMode::Blocking,
        }
    }
}

struct SubscriberInner<M> {
    id: SubscriberId,
    msg_types: Box<[MessageType]>,
    capacity: usize,
    delivery: DeliveryMode,
    tx: mpsc::Sender<M>,
}

/// Хэндл регистрации подписчика.
///
/// Хранит набор интересующих типов сообщений и передающую сторону канала
/// доставки. Клоны делят один `Sender`.
///
/// Реестр держит собственный сильный клон, пока подписчик зарегистрирован.
/// Уничтожение хэндла вызывающего без `deregister` не закрывает канал:
/// [`Subscription`] продолжает получать сообщения. Подписчик остаётся в
/// реестре, пока не будет вызван `deregister` или пока не уничтожена сама
/// [`Subscription`] (тогда диспетчер снимает его при следующей доставке).
/// [`Subscription::recv`] возвращает `Closed`, только когда уничтожены все
/// клоны, включая клон реестра.
pub struct Subscriber<M: Message = Envelope> {
    inner: Arc<SubscriberInner<M>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<M: Message> Subscriber<M> {
    /// Создаёт подписчика с блокирующей доставкой.
    ///
    /// Возвращает хэндл для регистрации и приёмник сообщений.
    pub fn new<I, T>(
        msg_types: I,
        capacity: usize,
    ) -> (Self, Subscription<M>)
    where
        I: IntoIterator<Item = T>,
        T: Into<MessageType>,
    {
        Self::with_options(msg_types, SubscriberOptions::default().with_capacity(capacity))
    }

    /// Создаёт подписчика с заданными параметрами.
    ///
    /// Повторяющиеся типы схлопываются, порядок первого вхождения сохраняется.
    /// Ёмкость приводится к диапазону `1..=MAX_CAPACITY`.
    pub fn with_options<I, T>(
        msg_types: I,
        options: SubscriberOptions,
    ) -> (Self, Subscription<M>)
    where
        I: IntoIterator<Item = T>,
        T: Into<MessageType>,
    {
        let mut types: Vec<MessageType> = Vec::new();
        for t in msg_types {
            let t = t.into();
            if !types.contains(&t) {
                types.push(t);
            }
        }

        let capacity = options.capacity.clamp(1, MAX_CAPACITY);
        let (tx, rx) = mpsc::channel(capacity);
        let id = SubscriberId::next();

        let subscriber = Self {
            inner: Arc::new(SubscriberInner {
                id,
                msg_types: types.into_boxed_slice(),
                capacity,
                delivery: options.delivery,
                tx,
            }),
        };

        (subscriber, Subscription { id, rx })
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Типы сообщений, на которые подписан подписчик.
    pub fn message_types(&self) -> &[MessageType] {
        &self.inner.msg_types
    }

    pub fn is_interested_in(
        &self,
        msg_type: &MessageType,
    ) -> bool {
        self.inner.msg_types.contains(msg_type)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.inner.delivery
    }

    /// `true`, если [`Subscription`] уничтожена или закрыта.
    pub fn is_closed(&self) -> bool {
        self.inner.tx.is_closed()
    }

    /// Передаёт сообщение в канал подписчика согласно его [`DeliveryMode`].
    pub(crate) async fn deliver(
        &self,
        msg: M,
    ) -> DeliveryOutcome {
        let tx = &self.inner.tx;
        match self.inner.delivery {
            DeliveryMode::Blocking => match tx.send(msg).await {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(_) => DeliveryOutcome::Closed,
            },
            DeliveryMode::DropOnFull => match tx.try_send(msg) {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(TrySendError::Full(_)) => DeliveryOutcome::Dropped,
                Err(TrySendError::Closed(_)) => DeliveryOutcome::Closed,
            },
            DeliveryMode::Timeout(timeout) => match tx.send_timeout(msg, timeout).await {
                Ok(()) => DeliveryOutcome::Delivered,
                Err(SendTimeoutError::Timeout(_)) => DeliveryOutcome::TimedOut,
                Err(SendTimeoutError::Closed(_)) => DeliveryOutcome::Closed,
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для Subscriber
////////////////////////////////////////////////////////////////////////////////

impl<M: Message> Clone for Subscriber<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Message> PartialEq for Subscriber<M> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<M: Message> Eq for Subscriber<M> {}

impl<M: Message> Hash for Subscriber<M> {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.inner.id.hash(state);
    }
}

impl<M: Message> fmt::Debug for Subscriber<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.inner.id)
            .field("msg_types", &self.inner.msg_types)
            .field("capacity", &self.inner.capacity)
            .field("delivery", &self.inner.delivery)
            .finish()
    }
}

/// Приёмная сторона канала доставки подписчика.
///
/// Принадлежит тому, кто создал подписчика. Сообщения приходят в порядке
/// их поступления во входную очередь диспетчера.
pub struct Subscription<M: Message = Envelope> {
    id: SubscriberId,
    rx: mpsc::Receiver<M>,
}

impl<M: Message> Subscription<M> {
    /// Асинхронно ожидает следующее сообщение.
    ///
    /// # Возвращает
    /// - `Ok(M)` при успешном получении сообщения
    /// - `Err(RecvError::Closed)`, если все хэндлы подписчика уничтожены и
    ///   буфер пуст
    pub async fn recv(&mut self) -> Result<M, RecvError> {
        self.rx.recv().await.ok_or(RecvError::Closed)
    }

    /// Пытается получить сообщение без ожидания.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.rx.try_recv().map_err(Into::into)
    }

    /// Ожидает сообщение не дольше `timeout`.
    ///
    /// Диспетчер не ограничивает доставку по времени, дедлайн задаётся на
    /// стороне потребителя.
    pub async fn recv_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<M, RecvError> {
        tokio::time::timeout(timeout, self.recv()).await?
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    /// Количество сообщений, ожидающих чтения.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Проверяет, закрыт ли канал (нет живых хэндлов или вызван `close`).
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Закрывает канал со стороны получателя.
    ///
    /// Уже буферизованные сообщения остаются доступны, новые доставки
    /// получают исход `Closed`, и цикл диспетчеризации снимает подписчика
    /// с регистрации.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl<M: Message> fmt::Debug for Subscription<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::time::timeout;

    use super::*;

    fn envelope(
        msg_type: &str,
        payload: &'static [u8],
    ) -> Envelope {
        Envelope::new(msg_type, Bytes::from_static(payload))
    }

    /// Тест проверяет, что повторяющиеся типы схлопываются.
    #[test]
    fn test_duplicate_types_are_collapsed() {
        let (sub, _rx) = Subscriber::<Envelope>::new(["a", "b", "a"], 4);
        assert_eq!(
            sub.message_types(),
            &[MessageType::new("a"), MessageType::new("b")]
        );
        assert!(sub.is_interested_in(&MessageType::new("b")));
        assert!(!sub.is_interested_in(&MessageType::new("c")));
    }

    /// Тест проверяет, что нулевая ёмкость поднимается до 1.
    #[test]
    fn test_zero_capacity_is_clamped() {
        let (sub, _rx) = Subscriber::<Envelope>::new(["a"], 0);
        assert_eq!(sub.capacity(), 1);
    }

    /// Тест проверяет, что идентичность определяется хэндлом, а не
    /// содержимым.
    #[test]
    fn test_identity_by_handle() {
        let (a, rx_a) = Subscriber::<Envelope>::new(["t"], 1);
        let (b, _rx_b) = Subscriber::<Envelope>::new(["t"], 1);

        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());
        assert_eq!(rx_a.subscriber_id(), a.id());
    }

    #[tokio::test]
    async fn test_blocking_delivery_and_recv() {
        let (sub, mut rx) = Subscriber::new(["t"], 2);

        assert_eq!(
            sub.deliver(envelope("t", b"one")).await,
            DeliveryOutcome::Delivered
        );
        assert_eq!(rx.len(), 1);

        let msg = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timed out")
            .expect("closed");
        assert_eq!(msg.payload, Bytes::from_static(b"one"));
        assert!(rx.is_empty());
    }

    /// Тест проверяет, что ёмкость за пределами диапазона приводится к
    /// границам, а не вызывает панику при создании канала.
    #[tokio::test]
    async fn test_capacity_clamped() {
        let (sub, mut rx) = Subscriber::new(["t"], usize::MAX);
        assert_eq!(sub.capacity(), MAX_CAPACITY);
        assert_eq!(sub.deliver(envelope("t", b"x")).await, DeliveryOutcome::Delivered);
        assert_eq!(rx.try_recv().unwrap().payload, Bytes::from_static(b"x"));

        let (sub, _rx) = Subscriber::<Envelope>::new(["t"], 0);
        assert_eq!(sub.capacity(), 1);
    }

    /// Тест проверяет, что блокирующая доставка ждёт освобождения места.
    #[tokio::test]
    async fn test_blocking_delivery_waits_for_space() {
        let (sub, mut rx) = Subscriber::new(["t"], 1);
        sub.deliver(envelope("t", b"first")).await;

        let pending = sub.deliver(envelope("t", b"second"));
        tokio::pin!(pending);
        assert!(timeout(Duration::from_millis(30), &mut pending).await.is_err());

        assert_eq!(rx.recv().await.unwrap().payload, Bytes::from_static(b"first"));
        assert_eq!(pending.await, DeliveryOutcome::Delivered);
        assert_eq!(rx.recv().await.unwrap().payload, Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_drop_on_full() {
        let options = SubscriberOptions::default()
            .with_capacity(1)
            .with_delivery(DeliveryMode::DropOnFull);
        let (sub, mut rx) = Subscriber::with_options(["t"], options);

        assert_eq!(sub.deliver(envelope("t", b"1")).await, DeliveryOutcome::Delivered);
        assert_eq!(sub.deliver(envelope("t", b"2")).await, DeliveryOutcome::Dropped);
        assert_eq!(rx.try_recv().unwrap().payload, Bytes::from_static(b"1"));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_timeout_delivery() {
        let options = SubscriberOptions::default()
            .with_capacity(1)
            .with_delivery(DeliveryMode::Timeout(Duration::from_millis(20)));
        let (sub, _rx) = Subscriber::with_options(["t"], options);

        assert_eq!(sub.deliver(envelope("t", b"1")).await, DeliveryOutcome::Delivered);
        assert_eq!(sub.deliver(envelope("t", b"2")).await, DeliveryOutcome::TimedOut);
    }

    /// Тест проверяет исход `Closed` после уничтожения приёмника.
    #[tokio::test]
    async fn test_delivery_to_dropped_subscription() {
        let (sub, rx) = Subscriber::new(["t"], 1);
        drop(rx);

        assert!(sub.is_closed());
        assert_eq!(sub.deliver(envelope("t", b"x")).await, DeliveryOutcome::Closed);
    }

    #[tokio::test]
    async fn test_explicit_close() {
        let (sub, mut rx) = Subscriber::new(["t"], 2);
        sub.deliver(envelope("t", b"kept")).await;
        rx.close();

        assert!(sub.is_closed());
        assert_eq!(sub.deliver(envelope("t", b"late")).await, DeliveryOutcome::Closed);
        assert_eq!(rx.recv().await.unwrap().payload, Bytes::from_static(b"kept"));
        assert_eq!(rx.recv().await, Err(RecvError::Closed));
    }

    /// Тест проверяет, что приёмник закрывается, когда уничтожены все хэндлы.
    #[tokio::test]
    async fn test_recv_closed_after_all_handles_dropped() {
        let (sub, mut rx) = Subscriber::<Envelope>::new(["t"], 1);
        let clone = sub.clone();
        drop(sub);
        assert!(!rx.is_closed());
        drop(clone);

        assert!(rx.is_closed());
        assert_eq!(rx.recv().await, Err(RecvError::Closed));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_recv_timeout() {
        let (_sub, mut rx) = Subscriber::<Envelope>::new(["t"], 1);
        let res = rx.recv_timeout(Duration::from_millis(10)).await;
        assert_eq!(res, Err(RecvError::Timeout));
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(DeliveryOutcome::TimedOut.to_string(), "timed_out");
        let name: &'static str = DeliveryOutcome::Delivered.into();
        assert_eq!(name, "delivered");
    }
}
