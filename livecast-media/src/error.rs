//! Attachment error types

use crate::slots::SlotId;
use livecast_core::LivecastError;
use thiserror::Error;

/// Errors reported through an attach operation's completion
///
/// None of these are fatal to a session: the session continues with
/// whichever slots did attach.
#[derive(Error, Debug)]
pub enum AttachError {
    /// No capture device is available for the requested role
    #[error("No capture device available for {kind}")]
    DeviceUnavailable {
        /// Role the device was requested for, e.g. "back camera"
        kind: String,
    },

    /// The transport cannot perform the requested operation
    #[error("Capability not supported: {capability}")]
    CapabilityUnsupported {
        /// Missing capability
        capability: String,
    },

    /// A newer request took over the slot; informational, not a failure
    #[error("Attachment superseded on {slot}")]
    Superseded {
        /// Slot the stale completion belonged to
        slot: SlotId,
    },

    /// The transport rejected or lost the attachment
    #[error("Transport error: {source}")]
    Transport {
        /// Underlying transport error
        #[from]
        source: LivecastError,
    },
}

impl AttachError {
    /// Whether this is the informational superseded outcome
    pub fn is_superseded(&self) -> bool {
        matches!(self, AttachError::Superseded { .. })
    }
}
