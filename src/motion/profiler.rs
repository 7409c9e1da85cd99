use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{InputError, Result};
use crate::motion::flow::FlowEstimator;
use crate::motion::frames::FrameSource;

/// Motion intensity per consecutive frame pair, in frame order
///
/// Holds `frame_count - 1` non-negative samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionSequence {
    samples: Vec<f64>,
}

impl MotionSequence {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }

    /// Smallest and largest sample, or `None` when empty
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let mut iter = self.samples.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl From<Vec<f64>> for MotionSequence {
    fn from(samples: Vec<f64>) -> Self {
        Self::new(samples)
    }
}

/// Turns a decoded frame stream into a [`MotionSequence`]
pub struct MotionProfiler {
    flow: Arc<dyn FlowEstimator>,
}

impl MotionProfiler {
    pub fn new(flow: Arc<dyn FlowEstimator>) -> Self {
        Self { flow }
    }

    /// Consume `source` and measure motion between every consecutive pair
    ///
    /// A single-frame source gives an empty sequence. A non-positive frame rate
    /// or a source without any readable frame is an invalid video.
    pub fn profile(&self, source: &mut dyn FrameSource) -> Result<MotionSequence> {
        let fps = source.frame_rate();
        if !(fps.is_finite() && fps > 0.0) {
            return Err(InputError::InvalidVideo {
                path: "<frame source>".to_string(),
                reason: format!("frame rate must be positive, got {}", fps),
            }.into());
        }

        let mut prev = source.next_frame()?.ok_or_else(|| InputError::InvalidVideo {
            path: "<frame source>".to_string(),
            reason: "no frame could be read".to_string(),
        })?;

        debug!("Profiling motion with {} at {}x{}", self.flow.name(), prev.width(), prev.height());

        let mut samples = Vec::new();
        while let Some(frame) = source.next_frame()? {
            let intensity = self.flow.motion_intensity(&prev, &frame)?;
            samples.push(intensity.max(0.0));
            prev = frame;

            if samples.len() % 250 == 0 {
                debug!("   {} frame pairs analyzed", samples.len());
            }
        }

        info!("   Motion profile: {} samples ({:.1}s at {:.2} fps)",
              samples.len(), (samples.len() + 1) as f64 / fps, fps);

        Ok(MotionSequence::new(samples))
    }
}
