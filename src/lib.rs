//! # Speed-Ramp
//!
//! Re-time a video segment by segment according to how much is happening on screen.
//!
//! Calm stretches play slower, busy stretches play faster. Motion is measured with
//! dense optical flow, aggregated into fixed-duration segments, mapped onto a speed
//! range and stabilized; every segment is then re-encoded at its own speed (audio
//! tempo included) and the pieces are joined without re-encoding.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use speed_ramp::{config::Config, pipeline::RampEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.ramp.min_speed = 0.75;
//! config.ramp.max_speed = 1.5;
//!
//! let engine = RampEngine::new(config)?;
//! let summary = engine.ramp("clip.mp4", "clip_ramped.mp4").await?;
//! println!("{} segments, ~{:.1}s", summary.segments_rendered, summary.estimated_output_duration);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`motion`] - frame decoding, optical flow and the motion profile
//! - [`curve`] - motion-to-speed mapping, jump clamping and smoothing
//! - [`render`] - per-segment re-timing and final assembly
//! - [`video`] - ffmpeg/ffprobe integration
//! - [`pipeline`] - the engine tying the stages together
//! - [`config`] - configuration management
//!
//! ## Custom Backends
//!
//! Motion estimation is pluggable through the [`FlowEstimator`](motion::FlowEstimator) trait:
//!
//! ```rust
//! use speed_ramp::motion::{FlowEstimator, FlowField};
//! use speed_ramp::video::GrayFrame;
//! use speed_ramp::Result;
//!
//! struct FrameDifference;
//!
//! impl FlowEstimator for FrameDifference {
//!     fn name(&self) -> &str {
//!         "frame-difference"
//!     }
//!
//!     fn estimate(&self, prev: &GrayFrame, next: &GrayFrame) -> Result<FlowField> {
//!         let vectors = prev
//!             .as_raw()
//!             .iter()
//!             .zip(next.as_raw())
//!             .map(|(&a, &b)| ((b as f32 - a as f32).abs(), 0.0))
//!             .collect();
//!         Ok(FlowField::new(prev.width(), prev.height(), vectors))
//!     }
//! }
//! ```

pub mod config;
pub mod curve;
pub mod error;
pub mod motion;
pub mod pipeline;
pub mod render;
pub mod video;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    curve::{SpeedCurve, SpeedCurveBuilder, SpeedReport},
    error::{RampError, Result},
    pipeline::{RampEngine, RampSummary},
};
