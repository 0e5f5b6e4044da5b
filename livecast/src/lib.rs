//! # Livecast
//!
//! Control core of a live-video publishing client over an RTMP-style
//! transport: which capture devices feed the outbound stream, and how the
//! outbound video bitrate tracks the network.
//!
//! ## Key Features
//!
//! - **Capture attachment lifecycle**: single/multi-camera and microphone
//!   attachment with mirroring policy, rotation, and superseded-completion
//!   handling
//! - **Bandwidth-adaptive bitrate**: additive-increase/additive-decrease
//!   driven by the transport's congestion signals, hard-bounded
//! - **Transport-agnostic**: the RTMP connection, codecs, and platform
//!   camera APIs stay behind traits supplied by the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livecast::{MockDeviceProvider, MockTransport, PublishSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), livecast::LivecastError> {
//!     let session = PublishSession::builder(
//!         Arc::new(MockTransport::new()),
//!         Arc::new(MockDeviceProvider::new()),
//!     )
//!     .video_size(854, 480)
//!     .video_bitrate(640_000)
//!     .build()?;
//!
//!     // On becoming visible/active:
//!     session.activate().await;
//!
//!     // User-triggered camera rotation:
//!     session.rotate_camera().await;
//!
//!     // On becoming inactive:
//!     session.deactivate().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use livecast_core::{
    BitrateController, BitrateLimits, BitrateState, CaptureDevice, DevicePosition, FpsUpdate,
    LivecastError, MockTransport, PublishTransport, StatsObserver, StreamHandle,
    TransportCapabilities, TransportEvent, TransportEventDispatcher, VideoOrientation, VideoSlot,
};

pub use livecast_media::{
    AttachError, DeviceAttachmentManager, DeviceProvider, MockDeviceProvider, SlotId, SlotPhase,
    SlotSnapshot,
};

// Public API modules
pub mod config;
pub mod fps;
pub mod session;

// Re-export main API types
pub use config::{AudioSettings, BitrateMode, ScalingMode, SessionConfig, VideoSettings};
pub use fps::{FpsHub, FpsToken};
pub use session::{PublishSession, SessionBuilder};
