//! Publish session lifecycle
//!
//! Ties the attachment manager, the bitrate controller, and the transport
//! event dispatcher together across the hosting surface's visible lifetime:
//! construct once, `activate` on becoming active, `deactivate` on becoming
//! inactive, `rotate_camera` on user request.

use crate::config::SessionConfig;
use crate::fps::{FpsHub, FpsToken};
use livecast_core::{
    BitrateController, DevicePosition, FpsUpdate, LivecastError, PublishTransport, StatsObserver,
    TransportEventDispatcher, VideoOrientation,
};
use livecast_media::{AttachError, DeviceAttachmentManager, DeviceProvider};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fluent builder for a [`PublishSession`]
pub struct SessionBuilder {
    transport: Arc<dyn PublishTransport>,
    devices: Arc<dyn DeviceProvider>,
    config: SessionConfig,
    stats: Option<Arc<dyn StatsObserver>>,
}

impl SessionBuilder {
    pub(crate) fn new(
        transport: Arc<dyn PublishTransport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> Self {
        Self {
            transport,
            devices,
            config: SessionConfig::default(),
            stats: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the target resolution
    pub fn video_size(mut self, width: u32, height: u32) -> Self {
        self.config.video.width = width;
        self.config.video.height = height;
        self
    }

    /// Set the default video bitrate; also the adaptation ceiling
    pub fn video_bitrate(mut self, bitrate: u32) -> Self {
        self.config.video.bitrate = bitrate;
        self.config.limits.ceiling = bitrate;
        self
    }

    /// Set the lowest bitrate the adaptation loop will publish
    pub fn bitrate_floor(mut self, floor: u32) -> Self {
        self.config.limits.floor = floor;
        self
    }

    /// Set the adaptation step size
    pub fn bitrate_step(mut self, step: u32) -> Self {
        self.config.limits.step = step;
        self
    }

    /// Set the audio bitrate
    pub fn audio_bitrate(mut self, bitrate: u32) -> Self {
        self.config.audio.bitrate = bitrate;
        self
    }

    /// Set the codec profile identifier
    pub fn profile_level(mut self, profile_level: &str) -> Self {
        self.config.video.profile_level = profile_level.to_string();
        self
    }

    /// Set the maximum key-frame interval
    pub fn key_frame_interval(mut self, interval: Duration) -> Self {
        self.config.video.max_key_frame_interval = interval;
        self
    }

    /// Prefer or avoid the hardware encoder
    pub fn hardware_encoder(mut self, enabled: bool) -> Self {
        self.config.video.hardware_encoder = enabled;
        self
    }

    /// Enable local audio monitoring
    pub fn loopback(mut self, enabled: bool) -> Self {
        self.config.loopback = enabled;
        self
    }

    /// Camera position attached to the primary slot on activation
    pub fn initial_position(mut self, position: DevicePosition) -> Self {
        self.config.initial_position = position;
        self
    }

    /// Orientation applied to the published video on activation
    pub fn orientation(mut self, orientation: VideoOrientation) -> Self {
        self.config.orientation = orientation;
        self
    }

    /// Attach a secondary camera when the transport supports it
    pub fn multi_camera(mut self, enabled: bool) -> Self {
        self.config.multi_camera = enabled;
        self
    }

    /// Forward stats updates to an observer
    pub fn stats_observer(mut self, observer: Arc<dyn StatsObserver>) -> Self {
        self.stats = Some(observer);
        self
    }

    /// Validate the configuration and build the session
    pub fn build(self) -> Result<PublishSession, LivecastError> {
        self.config.validate()?;

        let bitrate = Arc::new(BitrateController::new(
            self.config.limits,
            self.transport.clone(),
        ));
        let dispatcher = match self.stats {
            Some(stats) => Arc::new(TransportEventDispatcher::with_stats_observer(
                bitrate.clone(),
                stats,
            )),
            None => Arc::new(TransportEventDispatcher::new(bitrate.clone())),
        };
        let attachments = Arc::new(DeviceAttachmentManager::new(
            self.transport.clone(),
            self.devices,
        ));

        Ok(PublishSession {
            transport: self.transport,
            config: self.config,
            attachments,
            bitrate,
            dispatcher,
            fps: Arc::new(FpsHub::new()),
            active: Mutex::new(None),
        })
    }
}

/// Background tasks owned by an active session
struct ActiveState {
    event_pump: JoinHandle<()>,
    fps_pump: JoinHandle<()>,
}

/// One live-publishing session over an RTMP-style transport
pub struct PublishSession {
    transport: Arc<dyn PublishTransport>,
    config: SessionConfig,
    attachments: Arc<DeviceAttachmentManager>,
    bitrate: Arc<BitrateController>,
    dispatcher: Arc<TransportEventDispatcher>,
    fps: Arc<FpsHub>,
    active: Mutex<Option<ActiveState>>,
}

impl PublishSession {
    /// Start building a session over the given transport and device source
    pub fn builder(
        transport: Arc<dyn PublishTransport>,
        devices: Arc<dyn DeviceProvider>,
    ) -> SessionBuilder {
        SessionBuilder::new(transport, devices)
    }

    /// Bring the session up: apply stream settings, start event and FPS
    /// observation, and attach capture devices
    ///
    /// Attachment failures degrade the session (it continues with whichever
    /// slots succeeded) and are reported through the log. Calling
    /// `activate` on an active session does nothing.
    pub async fn activate(&self) {
        {
            let mut active = self.active.lock();
            if active.is_some() {
                debug!("activate called on an active session");
                return;
            }
            info!("activating publish session");

            self.transport.set_video_orientation(self.config.orientation);
            self.transport.set_loopback(self.config.loopback);
            self.transport.set_video_bitrate(self.bitrate.current_bitrate());

            // One task serializes every transport event into the
            // dispatcher; the four handlers share BitrateState and must not
            // interleave.
            let mut events = self.transport.subscribe_events();
            let dispatcher = self.dispatcher.clone();
            let event_pump = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => dispatcher.handle(event),
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!("{} transport events dropped by a slow pump", missed);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            let mut samples = self.transport.subscribe_fps();
            let hub = self.fps.clone();
            let fps_pump = tokio::spawn(async move {
                loop {
                    match samples.recv().await {
                        Ok(update) => hub.publish(update),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            *active = Some(ActiveState {
                event_pump,
                fps_pump,
            });
        }

        let secondary_position = self.config.initial_position.opposite();
        let (primary, secondary, audio) = tokio::join!(
            self.attachments.attach_primary(self.config.initial_position),
            async {
                if self.config.multi_camera {
                    Some(self.attachments.attach_secondary(secondary_position).await)
                } else {
                    None
                }
            },
            self.attachments.attach_audio(),
        );

        if let Err(e) = primary {
            warn!("primary camera attach failed: {}", e);
        }
        if let Some(Err(e)) = secondary {
            if matches!(e, AttachError::CapabilityUnsupported { .. }) {
                debug!("secondary camera skipped: {}", e);
            } else {
                warn!("secondary camera attach failed: {}", e);
            }
        }
        if let Err(e) = audio {
            warn!("audio attach failed: {}", e);
        }
    }

    /// Tear the session down: stop FPS observation, close the transport,
    /// then detach every capture slot
    ///
    /// The ordering guarantees no attachment teardown races a still-live
    /// transport callback. Calling `deactivate` on an inactive session does
    /// nothing.
    pub async fn deactivate(&self) {
        let state = self.active.lock().take();
        let Some(state) = state else {
            debug!("deactivate called on an inactive session");
            return;
        };
        info!("deactivating publish session");

        state.fps_pump.abort();
        state.event_pump.abort();

        if let Err(e) = self.transport.close().await {
            warn!("transport close failed: {}", e);
        }
        self.attachments.detach_all().await;
    }

    /// Swap front/back on every attached camera slot
    pub async fn rotate_camera(&self) {
        info!("rotate camera");
        if let Err(e) = self.attachments.rotate().await {
            warn!("camera rotation failed: {}", e);
        }
    }

    /// Forward a new orientation to the published video
    pub fn set_video_orientation(&self, orientation: VideoOrientation) {
        debug!("video orientation set to {:?}", orientation);
        self.transport.set_video_orientation(orientation);
    }

    /// Subscribe to frame-rate updates observed while the session is active
    pub fn observe_fps(&self) -> (FpsToken, mpsc::UnboundedReceiver<FpsUpdate>) {
        self.fps.subscribe()
    }

    /// Drop a frame-rate subscription; unknown tokens are ignored
    pub fn unobserve_fps(&self, token: FpsToken) {
        self.fps.unsubscribe(token);
    }

    /// Whether the session is currently active
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Currently published video bitrate in bits/sec
    pub fn current_bitrate(&self) -> u32 {
        self.bitrate.current_bitrate()
    }

    /// The configuration the session was built with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The capture attachment state
    pub fn attachments(&self) -> &DeviceAttachmentManager {
        &self.attachments
    }
}

impl std::fmt::Debug for PublishSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSession")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .field("current_bitrate", &self.current_bitrate())
            .finish()
    }
}
