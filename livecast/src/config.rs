//! Configuration types and defaults
//!
//! Defaults mirror a typical mobile publishing setup: 854x480 H.264
//! baseline at 640 kbit/s average with a 2 second key-frame interval, and
//! 64 kbit/s audio.

use livecast_core::{BitrateLimits, DevicePosition, LivecastError, VideoOrientation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the encoder fits source frames to the target resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Scale without preserving aspect ratio
    Normal,
    /// Preserve aspect ratio, pad with bars
    Letterbox,
    /// Preserve aspect ratio, crop overflow
    Trim,
}

/// Rate-control discipline of the video encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitrateMode {
    /// Hold the average bitrate at the target
    Average,
    /// Hold a constant bitrate
    Constant,
}

/// Video encoder settings for the published stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Opaque codec profile identifier, e.g. "H264_Baseline_3_1"
    pub profile_level: String,
    /// Default (maximum) video bitrate in bits/sec
    pub bitrate: u32,
    /// Maximum interval between key frames
    pub max_key_frame_interval: Duration,
    /// How source frames are fitted to the target resolution
    pub scaling_mode: ScalingMode,
    /// Rate-control discipline
    pub bitrate_mode: BitrateMode,
    /// Prefer the hardware encoder when available
    pub hardware_encoder: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
            profile_level: "H264_Baseline_3_1".to_string(),
            bitrate: 640_000,
            max_key_frame_interval: Duration::from_secs(2),
            scaling_mode: ScalingMode::Trim,
            bitrate_mode: BitrateMode::Average,
            hardware_encoder: true,
        }
    }
}

/// Audio encoder settings for the published stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Audio bitrate in bits/sec, constant for the session
    pub bitrate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { bitrate: 64_000 }
    }
}

/// Session-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Video encoder settings
    pub video: VideoSettings,
    /// Audio encoder settings
    pub audio: AudioSettings,
    /// Bounds and step for the adaptive bitrate loop; the ceiling is the
    /// configured video bitrate
    pub limits: BitrateLimits,
    /// Camera position attached to the primary slot on activation
    pub initial_position: DevicePosition,
    /// Orientation applied to the published video on activation
    pub orientation: VideoOrientation,
    /// Enable local audio monitoring (loopback)
    pub loopback: bool,
    /// Attach a secondary camera when the transport supports it
    pub multi_camera: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let video = VideoSettings::default();
        let limits = BitrateLimits {
            floor: 64_000,
            ceiling: video.bitrate,
            step: 32_000,
        };
        Self {
            video,
            audio: AudioSettings::default(),
            limits,
            initial_position: DevicePosition::Back,
            orientation: VideoOrientation::default(),
            loopback: false,
            multi_camera: true,
        }
    }
}

impl SessionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LivecastError> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(LivecastError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if self.video.profile_level.is_empty() {
            return Err(LivecastError::MissingConfiguration {
                field: "video.profile_level".to_string(),
            });
        }

        if self.video.max_key_frame_interval.is_zero() {
            return Err(LivecastError::InvalidConfiguration {
                message: "Key-frame interval must be positive".to_string(),
            });
        }

        if self.audio.bitrate == 0 {
            return Err(LivecastError::InvalidConfiguration {
                message: "Audio bitrate must be positive".to_string(),
            });
        }

        self.limits.validate()?;

        if self.limits.ceiling != self.video.bitrate {
            return Err(LivecastError::InvalidConfiguration {
                message: format!(
                    "bitrate ceiling {} must equal the configured video bitrate {}",
                    self.limits.ceiling, self.video.bitrate
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = SessionConfig::default();

        assert_eq!(config.video.width, 854);
        assert_eq!(config.video.height, 480);
        assert_eq!(config.video.profile_level, "H264_Baseline_3_1");
        assert_eq!(config.video.bitrate, 640_000);
        assert_eq!(config.video.max_key_frame_interval, Duration::from_secs(2));
        assert_eq!(config.video.scaling_mode, ScalingMode::Trim);
        assert_eq!(config.video.bitrate_mode, BitrateMode::Average);
        assert!(config.video.hardware_encoder);

        assert_eq!(config.audio.bitrate, 64_000);

        assert_eq!(config.limits.floor, 64_000);
        assert_eq!(config.limits.ceiling, 640_000);
        assert_eq!(config.limits.step, 32_000);

        assert_eq!(config.initial_position, DevicePosition::Back);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut config = SessionConfig::default();
        config.video.width = 0;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.video.max_key_frame_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.limits.floor = config.limits.ceiling + 1;
        assert!(config.validate().is_err());

        let mut config = SessionConfig::default();
        config.video.bitrate = 1_000_000; // ceiling left at 640_000
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "video": {
                "width": 1280,
                "height": 720,
                "profile_level": "H264_Main_4_1",
                "bitrate": 1000000,
                "max_key_frame_interval": { "secs": 2, "nanos": 0 },
                "scaling_mode": "Letterbox",
                "bitrate_mode": "Average",
                "hardware_encoder": false
            },
            "audio": { "bitrate": 64000 },
            "limits": { "floor": 64000, "ceiling": 1000000, "step": 32000 },
            "initial_position": "Front",
            "orientation": "LandscapeRight",
            "loopback": true,
            "multi_camera": false
        }"#;

        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.video.width, 1280);
        assert_eq!(config.video.scaling_mode, ScalingMode::Letterbox);
        assert_eq!(config.initial_position, DevicePosition::Front);
        assert_eq!(config.orientation, VideoOrientation::LandscapeRight);
        assert!(config.loopback);
        assert!(!config.multi_camera);
        assert!(config.validate().is_ok());
    }
}
