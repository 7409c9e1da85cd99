//! # Motion Analysis Module
//!
//! Measures how much the picture moves between consecutive frames.
//!
//! - [`FrameSource`] / [`FrameDecoder`] - sequential gray frame access
//! - [`FlowEstimator`] - dense optical flow, reduced to one scalar per frame pair
//! - [`MotionProfiler`] - drives both and produces a [`MotionSequence`]
//!
//! The built-in estimator is [`LucasKanadeFlow`]. With the `opencv` feature,
//! `FarnebackFlow` is available as well.

#[cfg(feature = "opencv")]
pub mod farneback;
pub mod flow;
pub mod frames;
pub mod profiler;

use std::sync::Arc;

use crate::config::{FlowBackend, MotionConfig};
use crate::error::{ConfigError, Result};

#[cfg(feature = "opencv")]
pub use farneback::FarnebackFlow;
pub use flow::{FlowEstimator, FlowField, LucasKanadeFlow};
pub use frames::{FfmpegFrameDecoder, FrameDecoder, FrameSource, MemoryFrameSource};
pub use profiler::{MotionProfiler, MotionSequence};

/// The flow estimator selected by `motion.estimator`
pub fn flow_estimator(config: &MotionConfig) -> Result<Arc<dyn FlowEstimator>> {
    match config.estimator {
        FlowBackend::LucasKanade => Ok(Arc::new(LucasKanadeFlow::from_config(config))),
        #[cfg(feature = "opencv")]
        FlowBackend::Farneback => Ok(Arc::new(FarnebackFlow::default())),
        #[cfg(not(feature = "opencv"))]
        FlowBackend::Farneback => Err(ConfigError::InvalidValue {
            key: "motion.estimator".to_string(),
            value: "farneback (build with the opencv feature)".to_string(),
        }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_estimator_is_lucas_kanade() {
        let flow = flow_estimator(&MotionConfig::default()).unwrap();
        assert_eq!(flow.name(), "lucas-kanade");
    }

    #[test]
    fn test_farneback_follows_feature() {
        let config = MotionConfig {
            estimator: FlowBackend::Farneback,
            ..MotionConfig::default()
        };
        match flow_estimator(&config) {
            Ok(flow) => {
                assert!(cfg!(feature = "opencv"));
                assert_eq!(flow.name(), "farneback");
            }
            Err(err) => {
                assert!(!cfg!(feature = "opencv"));
                assert_eq!(err.kind(), "config");
            }
        }
    }
}
