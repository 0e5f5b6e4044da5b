//! Bandwidth-adaptive bitrate control
//!
//! Additive-increase/additive-decrease with a fixed step and hard bounds:
//! each transport signal produces one immediate, clamped step. No smoothing
//! or windowing is applied; stats updates are a reserved extension point and
//! deliberately do not move the bitrate.

use crate::error::LivecastError;
use crate::transport::PublishTransport;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Bounds and step size for the adaptive bitrate loop, all in bits/sec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateLimits {
    /// Lowest bitrate the controller will ever publish
    pub floor: u32,
    /// Highest bitrate; equals the configured default video bitrate
    pub ceiling: u32,
    /// Size of a single adaptation step
    pub step: u32,
}

impl Default for BitrateLimits {
    fn default() -> Self {
        Self {
            floor: 64_000,
            ceiling: 640_000,
            step: 32_000,
        }
    }
}

impl BitrateLimits {
    /// Validate the limits
    pub fn validate(&self) -> Result<(), LivecastError> {
        if self.floor == 0 || self.ceiling == 0 {
            return Err(LivecastError::InvalidConfiguration {
                message: "bitrate floor and ceiling must be positive".to_string(),
            });
        }

        if self.floor > self.ceiling {
            return Err(LivecastError::InvalidConfiguration {
                message: format!(
                    "bitrate floor {} above ceiling {}",
                    self.floor, self.ceiling
                ),
            });
        }

        if self.step == 0 {
            return Err(LivecastError::InvalidConfiguration {
                message: "bitrate step must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Clamp a bitrate into `[floor, ceiling]`
    pub fn clamp(&self, bitrate: u32) -> u32 {
        bitrate.max(self.floor).min(self.ceiling)
    }
}

/// Mutable bitrate state, always within the configured bounds
#[derive(Debug, Clone, Copy)]
pub struct BitrateState {
    /// Currently published bitrate in bits/sec
    pub current: u32,
    /// Bounds and step the state is clamped against
    pub limits: BitrateLimits,
}

impl BitrateState {
    /// Initialize at the ceiling (full default quality)
    pub fn new(limits: BitrateLimits) -> Self {
        Self {
            current: limits.ceiling,
            limits,
        }
    }

    fn decrease(&mut self) -> u32 {
        self.current = self
            .limits
            .clamp(self.current.saturating_sub(self.limits.step));
        self.current
    }

    fn increase(&mut self) -> u32 {
        self.current = self
            .limits
            .clamp(self.current.saturating_add(self.limits.step));
        self.current
    }

    fn reset(&mut self) -> u32 {
        self.current = self.limits.ceiling;
        self.current
    }
}

/// Congestion-control loop keeping the published bitrate near what the
/// network can sustain
///
/// All four event handlers mutate the same state under one mutex, so
/// concurrent transport callbacks cannot tear a read-modify-write. Every
/// update pushes the clamped value into the transport's settable video
/// bitrate field. None of the operations can fail.
pub struct BitrateController {
    state: Mutex<BitrateState>,
    transport: Arc<dyn PublishTransport>,
}

impl BitrateController {
    /// Create a controller starting at the ceiling
    pub fn new(limits: BitrateLimits, transport: Arc<dyn PublishTransport>) -> Self {
        Self {
            state: Mutex::new(BitrateState::new(limits)),
            transport,
        }
    }

    /// The transport's publish buffer is backing up; step down, bounded by
    /// the floor
    pub fn on_insufficient_bandwidth(&self) {
        let bitrate = self.state.lock().decrease();
        debug!("insufficient bandwidth, video bitrate now {} b/s", bitrate);
        self.transport.set_video_bitrate(bitrate);
    }

    /// Throughput is healthy; step up, bounded by the ceiling
    pub fn on_sufficient_bandwidth(&self) {
        let bitrate = self.state.lock().increase();
        debug!("sufficient bandwidth, video bitrate now {} b/s", bitrate);
        self.transport.set_video_bitrate(bitrate);
    }

    /// Periodic statistics refresh; informational only
    pub fn on_stats_update(&self) {
        // Reserved extension point for smarter estimators. No state change.
    }

    /// The connection was torn down and reset; restart optimistically at
    /// full quality
    pub fn on_connection_cleared(&self) {
        let bitrate = self.state.lock().reset();
        debug!("connection cleared, video bitrate reset to {} b/s", bitrate);
        self.transport.set_video_bitrate(bitrate);
    }

    /// Currently published bitrate in bits/sec
    pub fn current_bitrate(&self) -> u32 {
        self.state.lock().current
    }

    /// Bounds and step size in effect
    pub fn limits(&self) -> BitrateLimits {
        self.state.lock().limits
    }
}

impl std::fmt::Debug for BitrateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitrateController")
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn test_controller() -> (Arc<MockTransport>, BitrateController) {
        let transport = Arc::new(MockTransport::new());
        let controller = BitrateController::new(BitrateLimits::default(), transport.clone());
        (transport, controller)
    }

    #[test]
    fn test_limits_validation() {
        assert!(BitrateLimits::default().validate().is_ok());

        let inverted = BitrateLimits {
            floor: 640_000,
            ceiling: 64_000,
            step: 32_000,
        };
        assert!(inverted.validate().is_err());

        let zero_step = BitrateLimits {
            step: 0,
            ..BitrateLimits::default()
        };
        assert!(zero_step.validate().is_err());
    }

    #[test]
    fn test_starts_at_ceiling() {
        let (_, controller) = test_controller();
        assert_eq!(controller.current_bitrate(), 640_000);
    }

    #[test]
    fn test_concrete_step_down_sequence() {
        // ceiling=640000, floor=64000, step=32000:
        // 640000 -> 608000 -> 576000 -> 544000
        let (transport, controller) = test_controller();

        controller.on_insufficient_bandwidth();
        assert_eq!(controller.current_bitrate(), 608_000);
        controller.on_insufficient_bandwidth();
        assert_eq!(controller.current_bitrate(), 576_000);
        controller.on_insufficient_bandwidth();
        assert_eq!(controller.current_bitrate(), 544_000);

        assert_eq!(transport.bitrate_history(), vec![608_000, 576_000, 544_000]);

        controller.on_connection_cleared();
        assert_eq!(controller.current_bitrate(), 640_000);
        assert_eq!(transport.last_bitrate(), Some(640_000));
    }

    #[test]
    fn test_floor_is_never_crossed() {
        let (_, controller) = test_controller();

        // (640000 - 64000) / 32000 = 18 steps to the floor; keep going well
        // past it.
        for _ in 0..40 {
            controller.on_insufficient_bandwidth();
            assert!(controller.current_bitrate() >= 64_000);
        }
        assert_eq!(controller.current_bitrate(), 64_000);

        // Two more at the floor leave it unchanged, no underflow.
        controller.on_insufficient_bandwidth();
        controller.on_insufficient_bandwidth();
        assert_eq!(controller.current_bitrate(), 64_000);
    }

    #[test]
    fn test_ceiling_is_never_crossed() {
        let (_, controller) = test_controller();

        controller.on_insufficient_bandwidth();
        controller.on_insufficient_bandwidth();

        for _ in 0..10 {
            controller.on_sufficient_bandwidth();
            assert!(controller.current_bitrate() <= 640_000);
        }
        assert_eq!(controller.current_bitrate(), 640_000);
    }

    #[test]
    fn test_n_steps_from_ceiling() {
        let limits = BitrateLimits::default();
        let (_, controller) = test_controller();

        for n in 1..=25u32 {
            controller.on_connection_cleared();
            for _ in 0..n {
                controller.on_insufficient_bandwidth();
            }
            let expected = limits
                .ceiling
                .saturating_sub(n * limits.step)
                .max(limits.floor);
            assert_eq!(controller.current_bitrate(), expected, "after {} steps", n);
        }
    }

    #[test]
    fn test_recovery_is_symmetric() {
        let (_, controller) = test_controller();

        for _ in 0..40 {
            controller.on_insufficient_bandwidth();
        }
        assert_eq!(controller.current_bitrate(), 64_000);

        for n in 1..=18u32 {
            controller.on_sufficient_bandwidth();
            assert_eq!(controller.current_bitrate(), 64_000 + n * 32_000);
        }
        assert_eq!(controller.current_bitrate(), 640_000);
    }

    #[test]
    fn test_stats_update_does_not_move_bitrate() {
        let (transport, controller) = test_controller();

        controller.on_insufficient_bandwidth();
        let before = controller.current_bitrate();
        let writes = transport.bitrate_history().len();

        controller.on_stats_update();
        controller.on_stats_update();

        assert_eq!(controller.current_bitrate(), before);
        assert_eq!(transport.bitrate_history().len(), writes);
    }

    #[test]
    fn test_reset_from_any_state() {
        let (_, controller) = test_controller();

        controller.on_connection_cleared();
        assert_eq!(controller.current_bitrate(), 640_000);

        for _ in 0..7 {
            controller.on_insufficient_bandwidth();
        }
        controller.on_connection_cleared();
        assert_eq!(controller.current_bitrate(), 640_000);
    }

    #[test]
    fn test_bounds_hold_under_concurrent_events() {
        let (_, controller) = test_controller();
        let controller = Arc::new(controller);

        let mut handles = Vec::new();
        for worker in 0..4 {
            let controller = controller.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    match (worker + i) % 3 {
                        0 => controller.on_insufficient_bandwidth(),
                        1 => controller.on_sufficient_bandwidth(),
                        _ => controller.on_connection_cleared(),
                    }
                    let current = controller.current_bitrate();
                    assert!((64_000..=640_000).contains(&current));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
