use fanout_error::{ensure, FanoutResult, SettingsError};

use super::{DeliveryMode, SubscriberOptions, DEFAULT_SUBSCRIBER_CAPACITY};

/// Ёмкость входной очереди по умолчанию.
pub const DEFAULT_INGRESS_CAPACITY: usize = 65_536;

/// Наибольшая ёмкость очереди или канала подписчика: предел ограниченных
/// каналов tokio (`Semaphore::MAX_PERMITS`).
pub const MAX_CAPACITY: usize = usize::MAX >> 3;

/// Параметры диспетчера, фиксируются при создании.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Ёмкость входной очереди
    pub ingress_capacity: usize,
    /// Ёмкость канала подписчиков, создаваемых через диспетчер
    pub subscriber_capacity: usize,
    /// Режим доставки таких подписчиков
    pub delivery: DeliveryMode,
}

impl DispatcherConfig {
    pub fn with_ingress_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.ingress_capacity = capacity;
        self
    }

    pub fn with_subscriber_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    pub fn with_delivery(
        mut self,
        delivery: DeliveryMode,
    ) -> Self {
        self.delivery = delivery;
        self
    }

    /// Проверяет ёмкости и таймаут доставки.
    pub fn validate(&self) -> FanoutResult<()> {
        ensure!(
            (1..=MAX_CAPACITY).contains(&self.ingress_capacity),
            SettingsError::InvalidCapacity {
                field: "ingress_capacity",
                value: self.ingress_capacity,
                max: MAX_CAPACITY,
            }
        );
        ensure!(
            (1..=MAX_CAPACITY).contains(&self.subscriber_capacity),
            SettingsError::InvalidCapacity {
                field: "subscriber_capacity",
                value: self.subscriber_capacity,
                max: MAX_CAPACITY,
            }
        );
        if let DeliveryMode::Timeout(timeout) = self.delivery {
            ensure!(
                !timeout.is_zero(),
                SettingsError::InvalidValue {
                    field: "delivery_timeout_ms",
                    value: "0".to_string(),
                }
            );
        }
        Ok(())
    }

    /// Параметры подписчика по умолчанию для этого диспетчера.
    pub fn subscriber_options(&self) -> SubscriberOptions {
        SubscriberOptions {
            capacity: self.subscriber_capacity,
            delivery: self.delivery,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            delivery: DeliveryMode::Blocking,
        }
    }
}
