use std::{borrow::Borrow, fmt, hash::Hash, sync::Arc};

use fanout_error::DispatchError;
use parking_lot::Mutex;
use strum_macros::{Display, IntoStaticStr};
use tokio::{
    runtime::Handle,
    sync::{
        mpsc::{self, error::TrySendError},
        Notify,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, trace, warn};

use super::{
    DeliveryOutcome, DispatchStats, DispatcherConfig, DispatcherMetrics, Envelope, Message,
    MessageType, Subscriber, SubscriberRegistry, Subscription, MAX_CAPACITY,
};

/// Фаза жизненного цикла диспетчера. Перезапуск не поддерживается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

struct Lifecycle<M> {
    phase: Phase,
    /// Приёмник входной очереди; передаётся циклу при `start`.
    ingress_rx: Option<mpsc::Receiver<M>>,
    task: Option<JoinHandle<()>>,
}

/// Диспетчер сообщений.
///
/// Владеет входной очередью и индексом подписок, запускает один фоновый цикл,
/// который для каждого сообщения ищет подписчиков его типа и по очереди
/// передаёт сообщение в канал каждого.
///
/// Экземпляр создаётся и передаётся владельцем явно; жизненный цикл
/// (создание → `start` → `stop` → уничтожение) лежит на нём.
pub struct Dispatcher<M: Message = Envelope> {
    config: DispatcherConfig,
    registry: Arc<SubscriberRegistry<M>>,
    metrics: Arc<DispatcherMetrics>,
    ingress_tx: mpsc::Sender<M>,
    /// Разовый сигнал остановки для цикла
    stop_signal: Arc<Notify>,
    lifecycle: Mutex<Lifecycle<M>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<M: Message> Dispatcher<M> {
    /// Создаёт диспетчер. Ёмкость очереди приводится к диапазону
    /// `1..=MAX_CAPACITY`; строгая проверка: [`DispatcherConfig::validate`].
    pub fn new(config: DispatcherConfig) -> Self {
        let capacity = config.ingress_capacity.clamp(1, MAX_CAPACITY);
        let (ingress_tx, ingress_rx) = mpsc::channel(capacity);

        Self {
            config,
            registry: Arc::new(SubscriberRegistry::new()),
            metrics: Arc::new(DispatcherMetrics::new()),
            ingress_tx,
            stop_signal: Arc::new(Notify::new()),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                ingress_rx: Some(ingress_rx),
                task: None,
            }),
        }
    }

    /// Диспетчер с заданной ёмкостью очереди и остальными параметрами по
    /// умолчанию.
    pub fn with_capacity(ingress_capacity: usize) -> Self {
        Self::new(DispatcherConfig::default().with_ingress_capacity(ingress_capacity))
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry<M>> {
        &self.registry
    }

    pub fn metrics(&self) -> &DispatcherMetrics {
        &self.metrics
    }

    pub fn stats(&self) -> DispatchStats {
        self.metrics.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Фактическая ёмкость входной очереди.
    pub fn ingress_capacity(&self) -> usize {
        self.ingress_tx.max_capacity()
    }

    /// Количество сообщений, ожидающих во входной очереди.
    pub fn ingress_len(&self) -> usize {
        self.ingress_tx.max_capacity() - self.ingress_tx.capacity()
    }

    /// Создаёт подписчика с ёмкостью и режимом доставки из конфигурации.
    ///
    /// Подписчик ещё не зарегистрирован.
    pub fn new_subscriber<I, T>(
        &self,
        msg_types: I,
    ) -> (Subscriber<M>, Subscription<M>)
    where
        I: IntoIterator<Item = T>,
        T: Into<MessageType>,
    {
        Subscriber::with_options(msg_types, self.config.subscriber_options())
    }

    /// См. [`SubscriberRegistry::register`].
    pub fn register<'a, I>(
        &self,
        subscribers: I,
    ) where
        I: IntoIterator<Item = &'a Subscriber<M>>,
    {
        self.registry.register(subscribers);
    }

    /// См. [`SubscriberRegistry::deregister`].
    ///
    /// Сообщение, для которого снимок подписчиков был взят до завершения
    /// отписки, ещё может быть доставлено: это допустимая best-effort
    /// семантика.
    pub fn deregister<'a, I>(
        &self,
        subscribers: I,
    ) where
        I: IntoIterator<Item = &'a Subscriber<M>>,
    {
        self.registry.deregister(subscribers);
    }

    /// См. [`SubscriberRegistry::lookup_subscribers`].
    pub fn lookup_subscribers<Q>(
        &self,
        msg_type: &Q,
    ) -> Vec<Subscriber<M>>
    where
        MessageType: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.registry.lookup_subscribers(msg_type)
    }

    /// Ставит сообщение во входную очередь.
    ///
    /// Если очередь заполнена, вызывающая задача ждёт освобождения места
    /// (backpressure). Ошибка `Closed` возможна только после завершения
    /// цикла диспетчеризации.
    pub async fn put_message(
        &self,
        msg: M,
    ) -> Result<(), DispatchError> {
        self.ingress_tx.send(msg).await.map_err(Into::into)
    }

    /// Неблокирующая постановка: при заполненной очереди возвращает
    /// `QueueFull` и учитывает отказ в метриках.
    pub fn try_put_message(
        &self,
        msg: M,
    ) -> Result<(), DispatchError> {
        match self.ingress_tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) => {
                self.metrics.record_rejected();
                trace!(msg_type = %msg.message_type(), "ingress queue full, message rejected");
                Err(DispatchError::QueueFull {
                    capacity: self.ingress_tx.max_capacity(),
                })
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Блокирующая постановка для производителей вне асинхронного контекста.
    ///
    /// # Panics
    /// Паникует при вызове из асинхронного контекста (как
    /// [`mpsc::Sender::blocking_send`]).
    pub fn blocking_put_message(
        &self,
        msg: M,
    ) -> Result<(), DispatchError> {
        self.ingress_tx.blocking_send(msg).map_err(Into::into)
    }

    /// Запускает фоновый цикл диспетчеризации на текущем tokio runtime.
    ///
    /// Вызывается ровно один раз; повторный вызов возвращает ошибку и не
    /// меняет состояние.
    pub fn start(&self) -> Result<(), DispatchError> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.phase {
            Phase::Idle => {}
            Phase::Running => return Err(DispatchError::AlreadyStarted),
            Phase::Stopped => return Err(DispatchError::AlreadyStopped),
        }
        let ingress_rx = lifecycle
            .ingress_rx
            .take()
            .ok_or(DispatchError::AlreadyStarted)?;

        info!(
            ingress_capacity = self.ingress_tx.max_capacity(),
            "Starting dispatcher..."
        );

        let dispatch_loop = DispatchLoop {
            ingress_rx,
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            stop_signal: Arc::clone(&self.stop_signal),
        };
        lifecycle.task = Some(runtime.spawn(dispatch_loop.run()));
        lifecycle.phase = Phase::Running;

        Ok(())
    }

    /// Посылает циклу сигнал остановки и сразу возвращается.
    ///
    /// Цикл завершит обработку текущего сообщения (доставит его всем
    /// подписчикам из снимка) и выйдет. Сообщения, оставшиеся во входной
    /// очереди, не доставляются. Дождаться выхода можно через
    /// [`wait_stopped`](Self::wait_stopped).
    pub fn stop(&self) -> Result<(), DispatchError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.phase {
            Phase::Idle => Err(DispatchError::NotStarted),
            Phase::Stopped => Err(DispatchError::AlreadyStopped),
            Phase::Running => {
                info!("Stopping dispatcher...");
                lifecycle.phase = Phase::Stopped;
                // notify_one сохраняет разрешение, если цикл сейчас занят доставкой.
                self.stop_signal.notify_one();
                Ok(())
            }
        }
    }

    /// Ожидает завершения фоновой задачи.
    ///
    /// Без предшествующего `stop` ждёт, пока диспетчер не будет остановлен.
    /// Повторные вызовы возвращаются сразу.
    pub async fn wait_stopped(&self) {
        let task = self.lifecycle.lock().task.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!(error = %err, "dispatch loop terminated abnormally");
            }
        }
    }
}

impl<M: Message> Drop for Dispatcher<M> {
    fn drop(&mut self) {
        if self.lifecycle.get_mut().phase == Phase::Running {
            self.stop_signal.notify_one();
        }
    }
}

impl<M: Message> fmt::Debug for Dispatcher<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Фоновый цикл: один логический исполнитель.
struct DispatchLoop<M: Message> {
    ingress_rx: mpsc::Receiver<M>,
    registry: Arc<SubscriberRegistry<M>>,
    metrics: Arc<DispatcherMetrics>,
    stop_signal: Arc<Notify>,
}

impl<M: Message> DispatchLoop<M> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                // Сигнал остановки проверяется первым: после него сообщения
                // из очереди не извлекаются.
                biased;

                _ = self.stop_signal.notified() => {
                    info!("Dispatch loop stopped");
                    break;
                }
                next = self.ingress_rx.recv() => match next {
                    Some(msg) => self.dispatch(msg).await,
                    None => {
                        debug!("ingress queue closed, dispatch loop exits");
                        break;
                    }
                },
            }
        }
    }

    /// Доставляет одно сообщение всем подписчикам его типа.
    ///
    /// Доставка последовательная: подписчик с заполненным каналом в режиме
    /// `Blocking` задерживает весь цикл.
    async fn dispatch(
        &self,
        msg: M,
    ) {
        self.metrics.record_received();
        let msg_type = msg.message_type().clone();
        debug!(msg_type = %msg_type, "dispatcher received message");

        let subscribers = self.registry.lookup_subscribers(&msg_type);
        if subscribers.is_empty() {
            self.metrics.record_unrouted();
            trace!(msg_type = %msg_type, "no subscribers for message type");
            return;
        }

        for subscriber in subscribers {
            let outcome = subscriber.deliver(msg.clone()).await;
            self.metrics.record_outcome(outcome);

            match outcome {
                DeliveryOutcome::Delivered => {
                    debug!(
                        msg_type = %msg_type,
                        subscriber = %subscriber.id(),
                        outcome = %outcome,
                        "message delivered"
                    );
                }
                DeliveryOutcome::Dropped | DeliveryOutcome::TimedOut => {
                    warn!(
                        msg_type = %msg_type,
                        subscriber = %subscriber.id(),
                        outcome = %outcome,
                        "subscriber channel is full, message discarded"
                    );
                }
                DeliveryOutcome::Closed => {
                    debug!(
                        msg_type = %msg_type,
                        subscriber = %subscriber.id(),
                        outcome = %outcome,
                        "subscriber channel closed, deregistering"
                    );
                    self.registry.deregister([&subscriber]);
                }
            }
        }
    }
}
