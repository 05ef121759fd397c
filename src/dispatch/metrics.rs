use std::sync::atomic::{AtomicU64, Ordering};

use super::DeliveryOutcome;

/// Счётчики цикла диспетчеризации.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Сообщения, извлечённые из входной очереди
    received: AtomicU64,
    /// Успешные доставки (по одной на подписчика)
    delivered: AtomicU64,
    /// Отброшено в режиме `DropOnFull`
    dropped: AtomicU64,
    /// Отброшено по таймауту в режиме `Timeout`
    timed_out: AtomicU64,
    /// Доставки в закрытый канал
    closed: AtomicU64,
    /// Сообщения без единого подписчика
    unrouted: AtomicU64,
    /// Отказы `try_put_message` из-за заполненной очереди
    rejected: AtomicU64,
}

/// Снимок [`DispatcherMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    pub received: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub timed_out: u64,
    pub closed: u64,
    pub unrouted: u64,
    pub rejected: u64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unrouted(&self) {
        self.unrouted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(
        &self,
        outcome: DeliveryOutcome,
    ) {
        let counter = match outcome {
            DeliveryOutcome::Delivered => &self.delivered,
            DeliveryOutcome::Dropped => &self.dropped,
            DeliveryOutcome::TimedOut => &self.timed_out,
            DeliveryOutcome::Closed => &self.closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            received: self.received.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
