//! Per-slot attachment state machine
//!
//! Each capture slot moves `Unbound -> Attaching -> Bound`, back to
//! `Attaching` on rotation, and to `Unbound` on release. A monotonically
//! increasing generation per slot detects completions that arrive after a
//! newer request took over: slot identity is authoritative, not request
//! identity, so the last writer wins.

use livecast_core::{CaptureDevice, DevicePosition, VideoSlot};
use parking_lot::Mutex;

/// Identity of a capture slot, video or audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// One of the video slots
    Video(VideoSlot),
    /// The audio input slot
    Audio,
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotId::Video(slot) => write!(f, "{}", slot),
            SlotId::Audio => write!(f, "audio slot"),
        }
    }
}

/// Attachment phase of a capture slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    /// No device bound and no attach pending
    Unbound,
    /// An attach request is in flight; any previously bound device is
    /// retained until the request resolves
    Attaching,
    /// A device is bound and feeding the slot
    Bound,
}

/// Inspectable state of a capture slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    /// Current attachment phase
    pub phase: SlotPhase,
    /// Committed device binding, if any
    pub device: Option<CaptureDevice>,
    /// Committed camera position, if any
    pub position: Option<DevicePosition>,
    /// Committed mirroring flag
    pub mirrored: bool,
}

/// Bookkeeping for one capture slot
///
/// `device`/`position`/`mirrored` always describe the committed binding;
/// `requested` is the target of an in-flight attach. On failure the
/// committed binding is retained, so a slot is never left unbound by a
/// failed rotation.
#[derive(Debug)]
pub(crate) struct SlotRecord {
    phase: SlotPhase,
    generation: u64,
    device: Option<CaptureDevice>,
    position: Option<DevicePosition>,
    mirrored: bool,
    requested: Option<DevicePosition>,
}

impl Default for SlotRecord {
    fn default() -> Self {
        Self {
            phase: SlotPhase::Unbound,
            generation: 0,
            device: None,
            position: None,
            mirrored: false,
            requested: None,
        }
    }
}

impl SlotRecord {
    /// Start an attach, superseding any in-flight request on this slot
    pub(crate) fn begin_attach(&mut self, position: Option<DevicePosition>) -> u64 {
        self.generation += 1;
        self.phase = SlotPhase::Attaching;
        self.requested = position;
        self.generation
    }

    /// Whether a completion with this generation is still the latest request
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Commit a successful attach
    pub(crate) fn commit(
        &mut self,
        device: CaptureDevice,
        position: Option<DevicePosition>,
        mirrored: bool,
    ) {
        self.phase = SlotPhase::Bound;
        self.device = Some(device);
        self.position = position;
        self.mirrored = mirrored;
        self.requested = position;
    }

    /// Resolve a failed attach: fall back to the committed binding
    pub(crate) fn fail(&mut self) {
        self.phase = if self.device.is_some() {
            SlotPhase::Bound
        } else {
            SlotPhase::Unbound
        };
        self.requested = self.position;
    }

    /// Release the slot, superseding any in-flight attach
    ///
    /// Returns whether there was a binding or pending attach to release.
    pub(crate) fn release(&mut self) -> bool {
        self.generation += 1;
        let was_active = self.phase != SlotPhase::Unbound;
        self.phase = SlotPhase::Unbound;
        self.device = None;
        self.position = None;
        self.mirrored = false;
        self.requested = None;
        was_active
    }

    /// Position the slot currently serves or is attaching toward
    pub(crate) fn active_position(&self) -> Option<DevicePosition> {
        match self.phase {
            SlotPhase::Unbound => None,
            SlotPhase::Attaching => self.requested,
            SlotPhase::Bound => self.position,
        }
    }

    pub(crate) fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            phase: self.phase,
            device: self.device.clone(),
            position: self.position,
            mirrored: self.mirrored,
        }
    }
}

/// The session's capture slots: two video, one audio
///
/// Per-slot mutexes serialize state changes on a slot while distinct slots
/// attach concurrently. Locks are never held across an await; the
/// generation check happens on re-acquisition.
#[derive(Debug, Default)]
pub(crate) struct CaptureSlots {
    primary: Mutex<SlotRecord>,
    secondary: Mutex<SlotRecord>,
    audio: Mutex<SlotRecord>,
}

impl CaptureSlots {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn video(&self, slot: VideoSlot) -> &Mutex<SlotRecord> {
        match slot {
            VideoSlot::Primary => &self.primary,
            VideoSlot::Secondary => &self.secondary,
        }
    }

    pub(crate) fn audio(&self) -> &Mutex<SlotRecord> {
        &self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn back_camera() -> CaptureDevice {
        CaptureDevice::camera("cam-back", "Back Camera", DevicePosition::Back)
    }

    fn front_camera() -> CaptureDevice {
        CaptureDevice::camera("cam-front", "Front Camera", DevicePosition::Front)
    }

    #[test]
    fn test_attach_commit_cycle() {
        let mut record = SlotRecord::default();
        assert_eq!(record.snapshot().phase, SlotPhase::Unbound);

        let generation = record.begin_attach(Some(DevicePosition::Back));
        assert_eq!(record.snapshot().phase, SlotPhase::Attaching);
        assert!(record.is_current(generation));

        record.commit(back_camera(), Some(DevicePosition::Back), false);
        let snapshot = record.snapshot();
        assert_eq!(snapshot.phase, SlotPhase::Bound);
        assert_eq!(snapshot.position, Some(DevicePosition::Back));
        assert!(!snapshot.mirrored);
    }

    #[test]
    fn test_newer_attach_supersedes_older() {
        let mut record = SlotRecord::default();

        let first = record.begin_attach(Some(DevicePosition::Front));
        let second = record.begin_attach(Some(DevicePosition::Back));

        assert!(!record.is_current(first));
        assert!(record.is_current(second));
    }

    #[test]
    fn test_failed_attach_retains_previous_binding() {
        let mut record = SlotRecord::default();

        record.begin_attach(Some(DevicePosition::Back));
        record.commit(back_camera(), Some(DevicePosition::Back), false);

        // Rotation toward Front fails; the Back binding must survive.
        record.begin_attach(Some(DevicePosition::Front));
        record.fail();

        let snapshot = record.snapshot();
        assert_eq!(snapshot.phase, SlotPhase::Bound);
        assert_eq!(snapshot.device, Some(back_camera()));
        assert_eq!(snapshot.position, Some(DevicePosition::Back));
    }

    #[test]
    fn test_failed_first_attach_leaves_slot_unbound() {
        let mut record = SlotRecord::default();

        record.begin_attach(Some(DevicePosition::Front));
        record.fail();

        assert_eq!(record.snapshot().phase, SlotPhase::Unbound);
        assert_eq!(record.snapshot().device, None);
    }

    #[test]
    fn test_release_supersedes_and_clears() {
        let mut record = SlotRecord::default();

        let generation = record.begin_attach(Some(DevicePosition::Front));
        assert!(record.release());
        assert!(!record.is_current(generation));
        assert_eq!(record.snapshot().phase, SlotPhase::Unbound);

        // Releasing an unbound slot reports nothing to release.
        assert!(!record.release());
    }

    #[test]
    fn test_active_position_tracks_phase() {
        let mut record = SlotRecord::default();
        assert_eq!(record.active_position(), None);

        record.begin_attach(Some(DevicePosition::Front));
        assert_eq!(record.active_position(), Some(DevicePosition::Front));

        record.commit(front_camera(), Some(DevicePosition::Front), true);
        assert_eq!(record.active_position(), Some(DevicePosition::Front));
    }

    #[test]
    fn test_slot_id_display() {
        assert_eq!(
            SlotId::Video(VideoSlot::Primary).to_string(),
            "primary video slot"
        );
        assert_eq!(SlotId::Audio.to_string(), "audio slot");
    }
}
