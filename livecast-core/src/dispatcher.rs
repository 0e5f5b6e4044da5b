//! Transport event demultiplexing
//!
//! One dispatcher routes the transport's asynchronous callbacks onto the
//! bitrate controller and an optional stats observer. Dispatch is pure
//! delegation on the caller's context: no I/O, never blocks.

use crate::bitrate::BitrateController;
use crate::transport::{StreamHandle, TransportEvent};
use std::sync::Arc;
use tracing::debug;

/// Passive observer for periodic statistics refreshes
pub trait StatsObserver: Send + Sync {
    /// Called on every stats update the transport delivers
    fn on_stats_update(&self, stream: StreamHandle);
}

/// Routes transport events to their single handler each
pub struct TransportEventDispatcher {
    bitrate: Arc<BitrateController>,
    stats: Option<Arc<dyn StatsObserver>>,
}

impl TransportEventDispatcher {
    /// Create a dispatcher driving the given bitrate controller
    pub fn new(bitrate: Arc<BitrateController>) -> Self {
        Self {
            bitrate,
            stats: None,
        }
    }

    /// Create a dispatcher that also forwards stats updates to an observer
    pub fn with_stats_observer(
        bitrate: Arc<BitrateController>,
        stats: Arc<dyn StatsObserver>,
    ) -> Self {
        Self {
            bitrate,
            stats: Some(stats),
        }
    }

    /// Dispatch one event; exactly one handler per event kind
    pub fn handle(&self, event: TransportEvent) {
        debug!("transport event: {}", event.kind());
        match event {
            TransportEvent::InsufficientBandwidth { .. } => {
                self.bitrate.on_insufficient_bandwidth();
            }
            TransportEvent::SufficientBandwidth { .. } => {
                self.bitrate.on_sufficient_bandwidth();
            }
            TransportEvent::StatsUpdate { stream } => {
                self.bitrate.on_stats_update();
                if let Some(stats) = &self.stats {
                    stats.on_stats_update(stream);
                }
            }
            TransportEvent::ConnectionCleared { .. } => {
                self.bitrate.on_connection_cleared();
            }
        }
    }
}

impl std::fmt::Debug for TransportEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportEventDispatcher")
            .field("bitrate", &self.bitrate)
            .field("has_stats_observer", &self.stats.is_some())
            .finish()
    }
}
