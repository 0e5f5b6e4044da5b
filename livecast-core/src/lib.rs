//! # Livecast Core
//!
//! Transport contract and congestion control for the livecast publishing
//! client. This crate defines the boundary to the RTMP-style transport
//! (events, capture attachment, settable stream fields) and the adaptive
//! bitrate loop driven by the transport's bandwidth-pressure signals.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod bitrate;
pub mod dispatcher;
pub mod error;
pub mod transport;

// Re-export main types
pub use bitrate::{BitrateController, BitrateLimits, BitrateState};
pub use dispatcher::{StatsObserver, TransportEventDispatcher};
pub use error::LivecastError;
pub use transport::{
    CaptureDevice, DevicePosition, FpsUpdate, MockTransport, PublishTransport, StreamHandle,
    TransportCapabilities, TransportEvent, VideoOrientation, VideoSlot,
};
