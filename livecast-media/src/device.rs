//! Capture device discovery
//!
//! Platform camera and microphone APIs are external collaborators; the
//! attachment manager only needs to resolve "the default device for this
//! role". Hosts implement [`DeviceProvider`] on top of their capture
//! subsystem.

use livecast_core::{CaptureDevice, DevicePosition};

/// Source of capture devices
pub trait DeviceProvider: Send + Sync {
    /// Default camera for the given position, if one is present
    fn default_camera(&self, position: DevicePosition) -> Option<CaptureDevice>;

    /// Default audio input device, if one is present
    fn default_microphone(&self) -> Option<CaptureDevice>;
}

/// Mock device provider for tests and unsupported platforms
#[derive(Debug, Clone)]
pub struct MockDeviceProvider {
    front: Option<CaptureDevice>,
    back: Option<CaptureDevice>,
    microphone: Option<CaptureDevice>,
}

impl MockDeviceProvider {
    /// Provider with a front camera, a back camera, and a microphone
    pub fn new() -> Self {
        Self {
            front: Some(CaptureDevice::camera(
                "camera-front",
                "Front Wide Camera",
                DevicePosition::Front,
            )),
            back: Some(CaptureDevice::camera(
                "camera-back",
                "Back Wide Camera",
                DevicePosition::Back,
            )),
            microphone: Some(CaptureDevice::microphone(
                "mic-default",
                "Built-in Microphone",
            )),
        }
    }

    /// Provider with no devices at all
    pub fn empty() -> Self {
        Self {
            front: None,
            back: None,
            microphone: None,
        }
    }

    /// Remove the camera at the given position
    pub fn without_camera(mut self, position: DevicePosition) -> Self {
        match position {
            DevicePosition::Front => self.front = None,
            DevicePosition::Back => self.back = None,
        }
        self
    }

    /// Remove the microphone
    pub fn without_microphone(mut self) -> Self {
        self.microphone = None;
        self
    }
}

impl Default for MockDeviceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProvider for MockDeviceProvider {
    fn default_camera(&self, position: DevicePosition) -> Option<CaptureDevice> {
        match position {
            DevicePosition::Front => self.front.clone(),
            DevicePosition::Back => self.back.clone(),
        }
    }

    fn default_microphone(&self) -> Option<CaptureDevice> {
        self.microphone.clone()
    }
}
