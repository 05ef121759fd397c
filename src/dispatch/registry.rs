use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash};

use dashmap::DashMap;
use tracing::debug;

use super::{Envelope, Message, MessageType, Subscriber, SubscriberId};

type InterestSet<M> = HashMap<SubscriberId, Subscriber<M>, ahash::RandomState>;

/// Индекс подписок: тип сообщения → множество подписчиков.
///
/// Шардированная `DashMap`: каждое множество изменяется под блокировкой
/// только своего шарда, поэтому регистрация и поиск по несвязанным типам не
/// сериализуются за одним глобальным замком. Вызывающая сторона никаких
/// блокировок не держит.
///
/// Пустые множества удаляются из индекса.
pub struct SubscriberRegistry<M: Message = Envelope> {
    index: DashMap<MessageType, InterestSet<M>, ahash::RandomState>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<M: Message> SubscriberRegistry<M> {
    pub fn new() -> Self {
        Self {
            index: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Добавляет каждого подписчика во множество каждого его типа.
    ///
    /// Идемпотентно для пары (тип, подписчик). Подписчик начинает получать
    /// сообщения со следующего цикла диспетчеризации.
    pub fn register<'a, I>(
        &self,
        subscribers: I,
    ) where
        I: IntoIterator<Item = &'a Subscriber<M>>,
    {
        for subscriber in subscribers {
            for msg_type in subscriber.message_types() {
                self.index
                    .entry(msg_type.clone())
                    .or_default()
                    .insert(subscriber.id(), subscriber.clone());
            }
            debug!(
                subscriber = %subscriber.id(),
                msg_types = ?subscriber.message_types(),
                "subscriber registered"
            );
        }
    }

    /// Удаляет каждого подписчика из множеств всех его типов.
    ///
    /// Незарегистрированный подписчик или тип: no-op. После возврата
    /// подписчик не попадёт ни в один последующий снимок [`lookup_subscribers`].
    ///
    /// [`lookup_subscribers`]: Self::lookup_subscribers
    pub fn deregister<'a, I>(
        &self,
        subscribers: I,
    ) where
        I: IntoIterator<Item = &'a Subscriber<M>>,
    {
        for subscriber in subscribers {
            let mut removed = 0usize;
            for msg_type in subscriber.message_types() {
                if self.remove_from(msg_type, subscriber.id()) {
                    removed += 1;
                }
            }
            if removed > 0 {
                debug!(subscriber = %subscriber.id(), removed, "subscriber deregistered");
            }
        }
    }

    /// Снимок текущего множества подписчиков типа (возможно, пустой).
    ///
    /// Снимок может устареть сразу после возврата: параллельная
    /// регистрация/отписка его не меняет.
    pub fn lookup_subscribers<Q>(
        &self,
        msg_type: &Q,
    ) -> Vec<Subscriber<M>>
    where
        MessageType: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(msg_type)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Зарегистрирован ли подписчик на данный тип.
    pub fn contains<Q>(
        &self,
        msg_type: &Q,
        subscriber: &Subscriber<M>,
    ) -> bool
    where
        MessageType: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(msg_type)
            .is_some_and(|set| set.contains_key(&subscriber.id()))
    }

    pub fn subscriber_count<Q>(
        &self,
        msg_type: &Q,
    ) -> usize
    where
        MessageType: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(msg_type).map_or(0, |set| set.len())
    }

    /// Типы, у которых есть хотя бы один подписчик.
    pub fn message_types(&self) -> Vec<MessageType> {
        self.index.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn remove_from(
        &self,
        msg_type: &MessageType,
        id: SubscriberId,
    ) -> bool {
        // RefMut держит блокировку шарда и должен быть отпущен до remove_if.
        let removed = match self.index.get_mut(msg_type) {
            Some(mut set) => set.remove(&id).is_some(),
            None => false,
        };
        if removed {
            // Проверка пустоты под блокировкой шарда: параллельная регистрация
            // либо уже вставила запись, либо создаст множество заново.
            self.index.remove_if(msg_type, |_, set| set.is_empty());
        }
        removed
    }
}

impl<M: Message> Default for SubscriberRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> fmt::Debug for SubscriberRegistry<M> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("message_types", &self.index.len())
            .finish()
    }
}
