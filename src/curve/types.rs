use serde::{Deserialize, Serialize};

/// Speed assigned to one fixed-duration window of the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSegment {
    /// Position in playback order
    pub index: usize,

    /// `index * segment_duration`, in seconds
    pub start_time: f64,

    /// Nominal segment length in seconds
    pub duration: f64,

    /// Speed straight from normalized motion
    pub raw_speed: f64,

    /// Speed after limiting the jump from the previous segment
    pub clamped_speed: f64,

    /// Final speed after the moving average
    pub smoothed_speed: f64,
}

impl SpeedSegment {
    /// The factor used for rendering
    pub fn speed(&self) -> f64 {
        self.smoothed_speed
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Per-segment speed factors, index-aligned and in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedCurve {
    segments: Vec<SpeedSegment>,

    /// Effective segment length in seconds
    pub segment_duration: f64,

    /// Motion samples aggregated into each segment
    pub segment_frame_count: usize,

    /// Set when the requested segment duration was shorter than one frame
    pub window_clamped: bool,
}

impl SpeedCurve {
    pub fn new(
        segments: Vec<SpeedSegment>,
        segment_duration: f64,
        segment_frame_count: usize,
        window_clamped: bool,
    ) -> Self {
        Self {
            segments,
            segment_duration,
            segment_frame_count,
            window_clamped,
        }
    }

    pub fn segments(&self) -> &[SpeedSegment] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeedSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final speed factors in index order
    pub fn speeds(&self) -> Vec<f64> {
        self.segments.iter().map(SpeedSegment::speed).collect()
    }
}

/// Diagnostic view of an analysis: the curve plus the settings that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedReport {
    pub speeds: Vec<f64>,
    pub segment_duration: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub frame_rate: f64,
    pub segment_frame_count: usize,
    pub window_clamped: bool,
    pub motion_samples: usize,
}
