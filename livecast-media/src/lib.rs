//! # Livecast Media
//!
//! Capture-device attachment for the livecast publishing client: which
//! physical camera and microphone feed which capture slot, mirroring policy,
//! rotation, and teardown — without leaking a previous attachment and
//! without crashing on absent hardware.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod attachment;
pub mod device;
pub mod error;
pub mod slots;

// Re-export main types
pub use attachment::DeviceAttachmentManager;
pub use device::{DeviceProvider, MockDeviceProvider};
pub use error::AttachError;
pub use slots::{SlotId, SlotPhase, SlotSnapshot};
