use anyhow::{bail, Result};
use serde::Deserialize;

/// Member details captured before rendering starts. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub username: String,
    pub region: String,
    pub magnitude: String,
}

impl Profile {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("profile username cannot be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Render environment: output raster size, frame rate, and clip length.
/// Defaults match the shipped promo (1920x1080, 30 fps, 14 seconds).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default = "default_resolution")]
    pub resolution: Resolution,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u32,
}

fn default_resolution() -> Resolution {
    Resolution {
        width: 1920,
        height: 1080,
    }
}

fn default_fps() -> u32 {
    30
}

fn default_duration_seconds() -> u32 {
    14
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            fps: default_fps(),
            duration_seconds: default_duration_seconds(),
        }
    }
}

impl Environment {
    pub fn validate(&self) -> Result<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            bail!(
                "resolution must be positive, got {}x{}",
                self.resolution.width,
                self.resolution.height
            );
        }
        if self.fps == 0 {
            bail!("fps must be > 0");
        }
        if self.duration_seconds == 0 {
            bail!("duration must be > 0 seconds");
        }
        Ok(())
    }

    pub fn total_frames(&self) -> u32 {
        self.fps * self.duration_seconds
    }

    /// Nominal tick period. The driver treats this as a request, not a promise.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }

    pub fn clip_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.duration_seconds))
    }
}

/// Capture encoder settings. The promo records VP9 WebM at 8 Mbps.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodingConfig {
    #[serde(default)]
    pub codec: VideoCodec,
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

fn default_bitrate() -> u32 {
    8_000_000
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            bitrate: default_bitrate(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    Vp9,
    Vp8,
}

impl Default for VideoCodec {
    fn default() -> Self {
        Self::Vp9
    }
}

impl VideoCodec {
    pub fn to_ffmpeg_codec(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
        }
    }
}
