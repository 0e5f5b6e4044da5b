//! Capture device attachment lifecycle
//!
//! Binds and unbinds cameras and the microphone against the transport's
//! capture slots, derives mirroring from the camera position, and survives
//! device switches without leaking a prior attachment. Hardware attach is
//! not instantaneous, so every request is guarded by the slot's generation
//! counter: a completion that arrives after a newer request for the same
//! slot is discarded as superseded.

use crate::device::DeviceProvider;
use crate::error::AttachError;
use crate::slots::{CaptureSlots, SlotId, SlotPhase, SlotSnapshot};
use livecast_core::{
    DevicePosition, PublishTransport, TransportCapabilities, VideoSlot,
};
use std::sync::Arc;
use tracing::{debug, warn};

fn camera_kind(position: DevicePosition) -> &'static str {
    match position {
        DevicePosition::Front => "front camera",
        DevicePosition::Back => "back camera",
    }
}

/// Orchestrates attach/detach of cameras and the microphone
pub struct DeviceAttachmentManager {
    transport: Arc<dyn PublishTransport>,
    devices: Arc<dyn DeviceProvider>,
    // Capability descriptor, read once; no runtime platform branching.
    capabilities: TransportCapabilities,
    slots: CaptureSlots,
}

impl DeviceAttachmentManager {
    /// Create a manager for the given transport and device source
    pub fn new(transport: Arc<dyn PublishTransport>, devices: Arc<dyn DeviceProvider>) -> Self {
        let capabilities = transport.capabilities();
        Self {
            transport,
            devices,
            capabilities,
            slots: CaptureSlots::new(),
        }
    }

    /// Capabilities read from the transport at construction
    pub fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    /// Attach the camera for `position` to the primary video slot
    ///
    /// Mirroring is derived from the position: front-facing feeds are
    /// mirrored. Failure is reported through the returned future and leaves
    /// the slot's previous binding in place.
    pub async fn attach_primary(&self, position: DevicePosition) -> Result<(), AttachError> {
        self.attach_video(VideoSlot::Primary, position).await
    }

    /// Attach the camera for `position` to the secondary video slot
    ///
    /// On transports without multi-camera capture this reports
    /// [`AttachError::CapabilityUnsupported`] without touching the
    /// transport.
    pub async fn attach_secondary(&self, position: DevicePosition) -> Result<(), AttachError> {
        if !self.capabilities.supports_multi_camera {
            return Err(AttachError::CapabilityUnsupported {
                capability: "multi-camera capture".to_string(),
            });
        }
        self.attach_video(VideoSlot::Secondary, position).await
    }

    /// Attach the default audio input device
    ///
    /// The shared application audio session is left to the caller:
    /// `configure_session` is always passed as `false` to avoid global
    /// audio-routing side effects.
    pub async fn attach_audio(&self) -> Result<(), AttachError> {
        let device = self
            .devices
            .default_microphone()
            .ok_or_else(|| AttachError::DeviceUnavailable {
                kind: "microphone".to_string(),
            })?;

        let generation = self.slots.audio().lock().begin_attach(None);
        debug!("attaching {} to audio slot", device.name);

        let result = self.transport.attach_audio(Some(device.clone()), false).await;

        let mut record = self.slots.audio().lock();
        if !record.is_current(generation) {
            debug!("audio attach superseded");
            return Err(AttachError::Superseded { slot: SlotId::Audio });
        }

        match result {
            Ok(()) => {
                record.commit(device, None, false);
                Ok(())
            }
            Err(source) => {
                record.fail();
                Err(source.into())
            }
        }
    }

    /// Release every bound slot: audio, then secondary video, then primary
    /// video
    ///
    /// Bumps each slot's generation so in-flight attaches are superseded.
    /// Safe when nothing is attached; a second call makes no transport
    /// calls.
    pub async fn detach_all(&self) {
        if self.slots.audio().lock().release() {
            if let Err(e) = self.transport.attach_audio(None, false).await {
                warn!("audio detach failed: {}", e);
            }
        }

        for slot in [VideoSlot::Secondary, VideoSlot::Primary] {
            if self.slots.video(slot).lock().release() {
                if let Err(e) = self.transport.attach_camera(slot, None).await {
                    warn!("{} detach failed: {}", slot, e);
                }
            }
        }
    }

    /// Swap Front/Back on every currently-attached video slot
    ///
    /// Mirroring is re-derived per slot and both slots rotate concurrently.
    /// A slot whose re-attach fails retains its previous binding and
    /// mirroring; the error is returned (first slot's error wins when both
    /// fail).
    pub async fn rotate(&self) -> Result<(), AttachError> {
        let primary_target = self
            .slots
            .video(VideoSlot::Primary)
            .lock()
            .active_position()
            .map(DevicePosition::opposite);
        let secondary_target = self
            .slots
            .video(VideoSlot::Secondary)
            .lock()
            .active_position()
            .map(DevicePosition::opposite);

        if primary_target.is_none() && secondary_target.is_none() {
            debug!("rotate requested with no attached video slots");
            return Ok(());
        }

        let (primary, secondary) = tokio::join!(
            self.rotate_slot(VideoSlot::Primary, primary_target),
            self.rotate_slot(VideoSlot::Secondary, secondary_target),
        );

        if primary.is_err() {
            if let Err(e) = &secondary {
                // The primary error is the one returned; still surface this
                // one.
                warn!("secondary camera rotation also failed: {}", e);
            }
        }
        primary.and(secondary)
    }

    async fn rotate_slot(
        &self,
        slot: VideoSlot,
        target: Option<DevicePosition>,
    ) -> Result<(), AttachError> {
        match target {
            Some(position) => self.attach_video(slot, position).await,
            None => Ok(()),
        }
    }

    /// Snapshot of a video slot's attachment state
    pub fn video_slot(&self, slot: VideoSlot) -> SlotSnapshot {
        self.slots.video(slot).lock().snapshot()
    }

    /// Snapshot of the audio slot's attachment state
    pub fn audio_slot(&self) -> SlotSnapshot {
        self.slots.audio().lock().snapshot()
    }

    async fn attach_video(
        &self,
        slot: VideoSlot,
        position: DevicePosition,
    ) -> Result<(), AttachError> {
        let device = self
            .devices
            .default_camera(position)
            .ok_or_else(|| AttachError::DeviceUnavailable {
                kind: camera_kind(position).to_string(),
            })?;

        let mirrored = position.is_mirrored();
        let generation = self.slots.video(slot).lock().begin_attach(Some(position));

        self.transport.set_mirrored(slot, mirrored);
        debug!("attaching {} ({}) to {}", device.name, camera_kind(position), slot);

        let result = self.transport.attach_camera(slot, Some(device.clone())).await;

        let mut record = self.slots.video(slot).lock();
        if !record.is_current(generation) {
            debug!("attach superseded on {}", slot);
            return Err(AttachError::Superseded {
                slot: SlotId::Video(slot),
            });
        }

        match result {
            Ok(()) => {
                record.commit(device, Some(position), mirrored);
                Ok(())
            }
            Err(source) => {
                record.fail();
                let retained = record.snapshot();
                drop(record);
                // Restore mirroring for the binding the slot kept.
                if retained.phase == SlotPhase::Bound {
                    self.transport.set_mirrored(slot, retained.mirrored);
                }
                Err(source.into())
            }
        }
    }
}

impl std::fmt::Debug for DeviceAttachmentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAttachmentManager")
            .field("capabilities", &self.capabilities)
            .field("slots", &self.slots)
            .finish()
    }
}
