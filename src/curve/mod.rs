//! # Speed Curve Module
//!
//! Converts a motion profile into one playback-speed factor per segment.
//!
//! ## Pipeline
//!
//! 1. **Windowing**: motion samples are grouped into segments of
//!    `round(segment_duration * fps)` samples (at least one)
//! 2. **Normalization**: each window mean is mapped onto `[min_speed, max_speed]`
//!    using the global motion range
//! 3. **Clamping**: a left-to-right fold limits every step to 20% of the
//!    previous clamped value
//! 4. **Smoothing**: a centered 5-point moving average with replicated edges
//!
//! Clamping bounds the change between neighbours, not the absolute value.
//!
//! ```rust
//! use speed_ramp::curve::{SpeedCurveBuilder, CurveParams};
//! use speed_ramp::motion::MotionSequence;
//!
//! let motion = MotionSequence::new(vec![0.1; 30].into_iter().chain(vec![4.0; 30]).collect());
//! let curve = SpeedCurveBuilder::new(CurveParams::default())
//!     .build(&motion, 30.0)
//!     .unwrap();
//! assert_eq!(curve.len(), 4);
//! ```

pub mod builder;
pub mod types;

pub use builder::{clamp_jumps, smooth, CurveParams, SpeedCurveBuilder};
pub use types::{SpeedCurve, SpeedReport, SpeedSegment};
