use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for speed-ramp
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Speed curve settings
    pub ramp: RampConfig,

    /// Motion analysis settings
    pub motion: MotionConfig,

    /// Codec settings shared by every rendered segment
    pub encoding: EncodingConfig,

    /// Segment rendering settings
    pub render: RenderConfig,

    /// Accepted input files
    pub input: InputConfig,

    /// External tool locations
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.ramp.validate()?;
        self.motion.validate()?;
        self.encoding.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Speed curve configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    /// Length of one speed segment in seconds
    pub segment_duration: f64,

    /// Speed assigned to the calmest segment
    pub min_speed: f64,

    /// Speed assigned to the busiest segment
    pub max_speed: f64,

    /// Largest allowed change between neighbouring segments, relative to the previous one
    pub max_step_ratio: f64,

    /// Centered moving-average window (odd)
    pub smoothing_window: usize,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            segment_duration: 0.5,
            min_speed: 0.8,
            max_speed: 1.2,
            max_step_ratio: 0.2,
            smoothing_window: 5,
        }
    }
}

impl RampConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.segment_duration.is_finite() && self.segment_duration > 0.0) {
            return Err(invalid("ramp.segment_duration", self.segment_duration).into());
        }

        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            return Err(invalid("ramp.min_speed", self.min_speed).into());
        }

        if !self.max_speed.is_finite() || self.max_speed < self.min_speed {
            return Err(invalid(
                "ramp.speed_range",
                format!("{}-{}", self.min_speed, self.max_speed),
            ).into());
        }

        if !(self.max_step_ratio.is_finite() && self.max_step_ratio > 0.0) {
            return Err(invalid("ramp.max_step_ratio", self.max_step_ratio).into());
        }

        if self.smoothing_window == 0 || self.smoothing_window % 2 == 0 {
            return Err(invalid("ramp.smoothing_window", self.smoothing_window).into());
        }

        Ok(())
    }
}

/// Motion analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Dense flow backend
    pub estimator: FlowBackend,

    /// Frames are downscaled to this width before flow estimation
    pub analysis_width: u32,

    /// Radius of the flow aggregation window in pixels
    pub window_radius: u32,

    /// Structure tensors with a smaller determinant yield zero motion
    pub min_determinant: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            estimator: FlowBackend::default(),
            analysis_width: 320,
            window_radius: 4,
            min_determinant: 1e-3,
        }
    }
}

impl MotionConfig {
    fn validate(&self) -> Result<()> {
        if self.analysis_width < 8 {
            return Err(invalid("motion.analysis_width", self.analysis_width).into());
        }

        if !(self.min_determinant.is_finite() && self.min_determinant >= 0.0) {
            return Err(invalid("motion.min_determinant", self.min_determinant).into());
        }

        if !self.estimator.is_available() {
            return Err(invalid("motion.estimator", self.estimator.name()).into());
        }

        Ok(())
    }
}

/// Available dense optical flow implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowBackend {
    /// Built-in Lucas–Kanade
    #[default]
    LucasKanade,

    /// OpenCV Farneback (needs the `opencv` feature)
    Farneback,
}

impl FlowBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LucasKanade => "lucas-kanade",
            Self::Farneback => "farneback",
        }
    }

    /// Whether this build can provide the backend
    pub fn is_available(&self) -> bool {
        match self {
            Self::LucasKanade => true,
            Self::Farneback => cfg!(feature = "opencv"),
        }
    }
}

/// Target codec configuration, identical for every segment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub video_codec: String,
    pub audio_codec: String,
    pub pixel_format: String,
    pub preset: Option<String>,
    pub crf: Option<u8>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            pixel_format: "yuv420p".to_string(),
            preset: None,
            crf: None,
        }
    }
}

impl EncodingConfig {
    fn validate(&self) -> Result<()> {
        if self.video_codec.trim().is_empty() {
            return Err(invalid("encoding.video_codec", &self.video_codec).into());
        }

        if self.audio_codec.trim().is_empty() {
            return Err(invalid("encoding.audio_codec", &self.audio_codec).into());
        }

        if let Some(crf) = self.crf {
            if crf > 51 {
                return Err(invalid("encoding.crf", crf).into());
            }
        }

        Ok(())
    }
}

/// Segment rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of segments rendered concurrently (0 = one per CPU)
    pub workers: usize,

    /// Parent directory for intermediate segment files
    pub temp_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            temp_dir: None,
        }
    }
}

impl RenderConfig {
    /// Worker count with the automatic setting resolved
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Accepted input files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub allowed_extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mp4", "mov", "avi", "mkv"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl InputConfig {
    /// Case-insensitive extension check
    pub fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.allowed_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}
