//! Frame-rate observation hub
//!
//! Explicit subscription interface for telemetry/UI consumers of the
//! transport's FPS samples. Registration and de-registration are symmetric
//! and idempotent: double-subscribing yields two independent subscriptions,
//! and unsubscribing an unknown token is a no-op.

use livecast_core::FpsUpdate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Handle identifying one FPS subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FpsToken(u64);

/// Fan-out point for frame-rate updates
#[derive(Debug, Default)]
pub struct FpsHub {
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<FpsUpdate>>>,
    next_token: AtomicU64,
}

impl FpsHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; the returned receiver yields every update
    /// published after this call
    pub fn subscribe(&self) -> (FpsToken, mpsc::UnboundedReceiver<FpsUpdate>) {
        let token = FpsToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(token.0, tx);
        (token, rx)
    }

    /// Remove a subscription; unknown tokens are ignored
    pub fn unsubscribe(&self, token: FpsToken) {
        self.subscribers.lock().remove(&token.0);
    }

    /// Deliver an update to every live subscriber, pruning dropped receivers
    pub fn publish(&self, update: FpsUpdate) {
        self.subscribers
            .lock()
            .retain(|_, tx| tx.send(update).is_ok());
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let hub = FpsHub::new();
        let (_token, mut rx) = hub.subscribe();

        hub.publish(FpsUpdate { fps: 30.0 });
        assert_eq!(rx.recv().await.unwrap().fps, 30.0);
    }

    #[tokio::test]
    async fn test_double_subscribe_fans_out() {
        let hub = FpsHub::new();
        let (_a, mut rx_a) = hub.subscribe();
        let (_b, mut rx_b) = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(FpsUpdate { fps: 24.0 });
        assert_eq!(rx_a.recv().await.unwrap().fps, 24.0);
        assert_eq!(rx_b.recv().await.unwrap().fps, 24.0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = FpsHub::new();
        let (token, _rx) = hub.subscribe();

        hub.unsubscribe(token);
        assert_eq!(hub.subscriber_count(), 0);

        // A second unsubscribe, or one for a never-registered token, must
        // not fault.
        hub.unsubscribe(token);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let hub = FpsHub::new();
        let (_token, rx) = hub.subscribe();
        drop(rx);

        hub.publish(FpsUpdate { fps: 60.0 });
        assert_eq!(hub.subscriber_count(), 0);
    }
}
