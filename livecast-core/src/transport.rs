//! Publishing transport contract
//!
//! The RTMP-style connection/stream pair is an external collaborator. This
//! module defines the trait the rest of the crate programs against: capture
//! attachment slots, settable stream fields, and the asynchronous event feed
//! that drives the bitrate controller. `MockTransport` implements the
//! contract for tests and for hosts without a live connection.

use crate::error::LivecastError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Identity of a published stream, carried by every transport event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamHandle(Uuid);

impl StreamHandle {
    /// Create a fresh stream identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StreamHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Physical position of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevicePosition {
    /// Front-facing (user-facing) camera
    Front,
    /// Back-facing (world-facing) camera
    Back,
}

impl DevicePosition {
    /// The other position, used when rotating cameras
    pub fn opposite(self) -> Self {
        match self {
            DevicePosition::Front => DevicePosition::Back,
            DevicePosition::Back => DevicePosition::Front,
        }
    }

    /// Front-facing feeds are mirrored by convention
    pub fn is_mirrored(self) -> bool {
        matches!(self, DevicePosition::Front)
    }
}

/// Video capture slot on the published stream
///
/// Slot identity is authoritative: whichever device is bound to a slot feeds
/// that channel, independent of attach-request ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoSlot {
    /// Primary camera channel (slot 0)
    Primary,
    /// Secondary camera channel (slot 1), present only with multi-camera
    /// capable transports
    Secondary,
}

impl VideoSlot {
    /// Numeric slot index used by the transport's attachment API
    pub fn index(self) -> u8 {
        match self {
            VideoSlot::Primary => 0,
            VideoSlot::Secondary => 1,
        }
    }
}

impl std::fmt::Display for VideoSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoSlot::Primary => write!(f, "primary video slot"),
            VideoSlot::Secondary => write!(f, "secondary video slot"),
        }
    }
}

/// A capture device as the transport sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    /// Stable device identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Camera position; `None` for audio input devices
    pub position: Option<DevicePosition>,
}

impl CaptureDevice {
    /// Create a camera device description
    pub fn camera(id: &str, name: &str, position: DevicePosition) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position: Some(position),
        }
    }

    /// Create an audio input device description
    pub fn microphone(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            position: None,
        }
    }
}

/// Orientation applied to the published video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoOrientation {
    /// Device upright
    Portrait,
    /// Device upside down
    PortraitUpsideDown,
    /// Device rotated left
    LandscapeLeft,
    /// Device rotated right
    LandscapeRight,
}

impl Default for VideoOrientation {
    fn default() -> Self {
        VideoOrientation::Portrait
    }
}

/// Capabilities advertised by a transport
///
/// Read once at construction; callers disable the corresponding operations
/// instead of branching on platform versions at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Whether the transport supports simultaneous multi-camera capture
    pub supports_multi_camera: bool,
}

impl TransportCapabilities {
    /// Capabilities of a transport limited to one camera at a time
    pub fn single_camera() -> Self {
        Self {
            supports_multi_camera: false,
        }
    }
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self {
            supports_multi_camera: true,
        }
    }
}

/// Events delivered asynchronously by the transport while publishing
///
/// No payload beyond the stream identity; each kind has exactly one handler
/// in [`crate::dispatcher::TransportEventDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Outgoing data is backing up in the publish buffer
    InsufficientBandwidth {
        /// Stream the pressure was observed on
        stream: StreamHandle,
    },
    /// Throughput is healthy again
    SufficientBandwidth {
        /// Stream the signal was observed on
        stream: StreamHandle,
    },
    /// Periodic statistics refresh
    StatsUpdate {
        /// Stream the statistics belong to
        stream: StreamHandle,
    },
    /// The underlying connection was torn down and reset
    ConnectionCleared {
        /// Stream whose connection was cleared
        stream: StreamHandle,
    },
}

impl TransportEvent {
    /// Stream identity the event was delivered for
    pub fn stream(&self) -> StreamHandle {
        match self {
            TransportEvent::InsufficientBandwidth { stream }
            | TransportEvent::SufficientBandwidth { stream }
            | TransportEvent::StatsUpdate { stream }
            | TransportEvent::ConnectionCleared { stream } => *stream,
        }
    }

    /// Get the event kind as a string
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::InsufficientBandwidth { .. } => "insufficient_bandwidth",
            TransportEvent::SufficientBandwidth { .. } => "sufficient_bandwidth",
            TransportEvent::StatsUpdate { .. } => "stats_update",
            TransportEvent::ConnectionCleared { .. } => "connection_cleared",
        }
    }
}

/// Frame-rate sample pushed by the transport while publishing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsUpdate {
    /// Frames per second currently going out
    pub fps: f64,
}

/// Contract implemented by the RTMP-style publishing transport
///
/// Capture attachment is asynchronous: it depends on hardware and OS-level
/// permission, so completion arrives through the returned future rather than
/// synchronously. Passing `None` as the device detaches the slot.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Identity of the stream this transport publishes
    fn stream(&self) -> StreamHandle;

    /// Capabilities of this transport
    fn capabilities(&self) -> TransportCapabilities;

    /// Attach a camera to a video slot, or detach it with `None`
    async fn attach_camera(
        &self,
        slot: VideoSlot,
        device: Option<CaptureDevice>,
    ) -> Result<(), LivecastError>;

    /// Attach an audio input device, or detach it with `None`
    ///
    /// `configure_session` controls whether the transport also configures the
    /// shared application audio session.
    async fn attach_audio(
        &self,
        device: Option<CaptureDevice>,
        configure_session: bool,
    ) -> Result<(), LivecastError>;

    /// Set the mirroring flag on a video slot's capture
    fn set_mirrored(&self, slot: VideoSlot, mirrored: bool);

    /// Set the outbound video bitrate in bits per second
    fn set_video_bitrate(&self, bitrate: u32);

    /// Set the orientation of the published video
    fn set_video_orientation(&self, orientation: VideoOrientation);

    /// Enable or disable local audio monitoring (loopback)
    fn set_loopback(&self, enabled: bool);

    /// Subscribe to the transport's asynchronous event feed
    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent>;

    /// Subscribe to frame-rate samples
    fn subscribe_fps(&self) -> broadcast::Receiver<FpsUpdate>;

    /// Close the publishing session
    async fn close(&self) -> Result<(), LivecastError>;
}

/// Recorded state of a [`MockTransport`]
#[derive(Debug, Default)]
struct MockTransportState {
    camera_calls: Vec<(VideoSlot, Option<CaptureDevice>)>,
    audio_calls: Vec<(Option<CaptureDevice>, bool)>,
    mirror_calls: Vec<(VideoSlot, bool)>,
    bitrate_history: Vec<u32>,
    orientation: Option<VideoOrientation>,
    loopback: Option<bool>,
    rejected_devices: HashSet<String>,
    attach_delay: Option<Duration>,
    closed: bool,
}

/// Mock transport for tests and hosts without a live connection
///
/// Records every call it receives and lets tests inject transport events,
/// frame-rate samples, attachment rejections, and an artificial attach delay
/// for exercising superseded completions.
#[derive(Debug)]
pub struct MockTransport {
    stream: StreamHandle,
    capabilities: TransportCapabilities,
    event_tx: broadcast::Sender<TransportEvent>,
    fps_tx: broadcast::Sender<FpsUpdate>,
    state: Mutex<MockTransportState>,
}

impl MockTransport {
    /// Create a mock transport with default capabilities
    pub fn new() -> Self {
        Self::with_capabilities(TransportCapabilities::default())
    }

    /// Create a mock transport advertising the given capabilities
    pub fn with_capabilities(capabilities: TransportCapabilities) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (fps_tx, _) = broadcast::channel(100);

        Self {
            stream: StreamHandle::new(),
            capabilities,
            event_tx,
            fps_tx,
            state: Mutex::new(MockTransportState::default()),
        }
    }

    /// Deliver a transport event to all subscribers
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Deliver a frame-rate sample to all subscribers
    pub fn emit_fps(&self, fps: f64) {
        let _ = self.fps_tx.send(FpsUpdate { fps });
    }

    /// Make future attach calls for this device id fail
    pub fn reject_device(&self, device_id: &str) {
        self.state
            .lock()
            .rejected_devices
            .insert(device_id.to_string());
    }

    /// Delay attach completions by `delay`; `None` restores immediate
    /// completion
    pub fn set_attach_delay(&self, delay: Option<Duration>) {
        self.state.lock().attach_delay = delay;
    }

    /// Camera attach/detach calls in arrival order
    pub fn camera_calls(&self) -> Vec<(VideoSlot, Option<CaptureDevice>)> {
        self.state.lock().camera_calls.clone()
    }

    /// Audio attach/detach calls in arrival order
    pub fn audio_calls(&self) -> Vec<(Option<CaptureDevice>, bool)> {
        self.state.lock().audio_calls.clone()
    }

    /// Mirroring updates in arrival order
    pub fn mirror_calls(&self) -> Vec<(VideoSlot, bool)> {
        self.state.lock().mirror_calls.clone()
    }

    /// Every bitrate value written, oldest first
    pub fn bitrate_history(&self) -> Vec<u32> {
        self.state.lock().bitrate_history.clone()
    }

    /// Most recent bitrate value written, if any
    pub fn last_bitrate(&self) -> Option<u32> {
        self.state.lock().bitrate_history.last().copied()
    }

    /// Orientation last applied, if any
    pub fn orientation(&self) -> Option<VideoOrientation> {
        self.state.lock().orientation
    }

    /// Loopback setting last applied, if any
    pub fn loopback(&self) -> Option<bool> {
        self.state.lock().loopback
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    async fn simulate_attach(&self, device: Option<&CaptureDevice>) -> Result<(), LivecastError> {
        let delay = self.state.lock().attach_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(device) = device {
            if self.state.lock().rejected_devices.contains(&device.id) {
                return Err(LivecastError::AttachRejected {
                    reason: format!("device {} unavailable", device.id),
                });
            }
        }

        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PublishTransport for MockTransport {
    fn stream(&self) -> StreamHandle {
        self.stream
    }

    fn capabilities(&self) -> TransportCapabilities {
        self.capabilities
    }

    async fn attach_camera(
        &self,
        slot: VideoSlot,
        device: Option<CaptureDevice>,
    ) -> Result<(), LivecastError> {
        let result = self.simulate_attach(device.as_ref()).await;
        self.state.lock().camera_calls.push((slot, device));
        result
    }

    async fn attach_audio(
        &self,
        device: Option<CaptureDevice>,
        configure_session: bool,
    ) -> Result<(), LivecastError> {
        let result = self.simulate_attach(device.as_ref()).await;
        self.state.lock().audio_calls.push((device, configure_session));
        result
    }

    fn set_mirrored(&self, slot: VideoSlot, mirrored: bool) {
        self.state.lock().mirror_calls.push((slot, mirrored));
    }

    fn set_video_bitrate(&self, bitrate: u32) {
        self.state.lock().bitrate_history.push(bitrate);
    }

    fn set_video_orientation(&self, orientation: VideoOrientation) {
        self.state.lock().orientation = Some(orientation);
    }

    fn set_loopback(&self, enabled: bool) {
        self.state.lock().loopback = Some(enabled);
    }

    fn subscribe_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.event_tx.subscribe()
    }

    fn subscribe_fps(&self) -> broadcast::Receiver<FpsUpdate> {
        self.fps_tx.subscribe()
    }

    async fn close(&self) -> Result<(), LivecastError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_and_stream() {
        let stream = StreamHandle::new();
        let event = TransportEvent::InsufficientBandwidth { stream };
        assert_eq!(event.kind(), "insufficient_bandwidth");
        assert_eq!(event.stream(), stream);

        let event = TransportEvent::ConnectionCleared { stream };
        assert_eq!(event.kind(), "connection_cleared");
    }

    #[test]
    fn test_position_mirroring_convention() {
        assert!(DevicePosition::Front.is_mirrored());
        assert!(!DevicePosition::Back.is_mirrored());
        assert_eq!(DevicePosition::Front.opposite(), DevicePosition::Back);
        assert_eq!(DevicePosition::Back.opposite(), DevicePosition::Front);
    }

    #[test]
    fn test_slot_indices() {
        assert_eq!(VideoSlot::Primary.index(), 0);
        assert_eq!(VideoSlot::Secondary.index(), 1);
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let transport = MockTransport::new();
        let camera = CaptureDevice::camera("cam0", "Back Camera", DevicePosition::Back);

        transport.set_mirrored(VideoSlot::Primary, false);
        transport
            .attach_camera(VideoSlot::Primary, Some(camera.clone()))
            .await
            .unwrap();
        transport.set_video_bitrate(640_000);

        assert_eq!(transport.camera_calls(), vec![(VideoSlot::Primary, Some(camera))]);
        assert_eq!(transport.mirror_calls(), vec![(VideoSlot::Primary, false)]);
        assert_eq!(transport.last_bitrate(), Some(640_000));
    }

    #[tokio::test]
    async fn test_mock_rejects_configured_device() {
        let transport = MockTransport::new();
        transport.reject_device("cam1");

        let camera = CaptureDevice::camera("cam1", "Front Camera", DevicePosition::Front);
        let result = transport.attach_camera(VideoSlot::Primary, Some(camera)).await;
        assert!(matches!(result, Err(LivecastError::AttachRejected { .. })));
    }

    #[tokio::test]
    async fn test_mock_event_delivery() {
        let transport = MockTransport::new();
        let mut events = transport.subscribe_events();

        let event = TransportEvent::StatsUpdate {
            stream: transport.stream(),
        };
        transport.emit(event);

        assert_eq!(events.recv().await.unwrap(), event);
    }
}
