use tracing::{debug, warn};

use crate::config::RampConfig;
use crate::curve::types::{SpeedCurve, SpeedSegment};
use crate::error::{ComputationError, Result};
use crate::motion::MotionSequence;

/// Added to the motion range so constant motion does not divide by zero
pub const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Parameters of the motion-to-speed mapping
#[derive(Debug, Clone, PartialEq)]
pub struct CurveParams {
    pub segment_duration: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub max_step_ratio: f64,
    pub smoothing_window: usize,
}

impl From<&RampConfig> for CurveParams {
    fn from(config: &RampConfig) -> Self {
        Self {
            segment_duration: config.segment_duration,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            max_step_ratio: config.max_step_ratio,
            smoothing_window: config.smoothing_window,
        }
    }
}

impl Default for CurveParams {
    fn default() -> Self {
        Self::from(&RampConfig::default())
    }
}

/// Aggregates motion into per-segment speeds, then stabilizes the curve
///
/// Steps, in order: window means normalized into `[min_speed, max_speed]`,
/// a sequential clamp on segment-to-segment jumps, and a centered moving average.
#[derive(Debug, Clone)]
pub struct SpeedCurveBuilder {
    params: CurveParams,
}

impl SpeedCurveBuilder {
    pub fn new(params: CurveParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &RampConfig) -> Self {
        Self::new(CurveParams::from(config))
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    pub fn build(&self, motion: &MotionSequence, frame_rate: f64) -> Result<SpeedCurve> {
        let p = &self.params;
        self.check(frame_rate)?;

        let (frames_per_segment, window_clamped) = segment_frame_count(p.segment_duration, frame_rate);
        let segment_duration = if window_clamped {
            warn!("Segment duration {:.4}s is shorter than one frame at {:.2} fps; using 1 frame per segment",
                  p.segment_duration, frame_rate);
            1.0 / frame_rate
        } else {
            p.segment_duration
        };

        if motion.is_empty() {
            return Ok(SpeedCurve::new(Vec::new(), segment_duration, frames_per_segment, window_clamped));
        }

        let raw = window_speeds(motion, frames_per_segment, p.min_speed, p.max_speed);
        let clamped = clamp_jumps(&raw, p.max_step_ratio);
        let smoothed = smooth(&clamped, p.smoothing_window);

        debug!("Built {} segments of {} samples: raw {:?}", raw.len(), frames_per_segment, raw);

        let segments = raw
            .iter()
            .zip(&clamped)
            .zip(&smoothed)
            .enumerate()
            .map(|(index, ((&raw_speed, &clamped_speed), &smoothed_speed))| SpeedSegment {
                index,
                start_time: index as f64 * segment_duration,
                duration: segment_duration,
                raw_speed,
                clamped_speed,
                smoothed_speed,
            })
            .collect();

        Ok(SpeedCurve::new(segments, segment_duration, frames_per_segment, window_clamped))
    }

    fn check(&self, frame_rate: f64) -> Result<()> {
        let p = &self.params;
        let problem = if !(frame_rate.is_finite() && frame_rate > 0.0) {
            Some(format!("frame rate must be positive, got {}", frame_rate))
        } else if !(p.segment_duration.is_finite() && p.segment_duration > 0.0) {
            Some(format!("segment duration must be positive, got {}", p.segment_duration))
        } else if !(p.min_speed.is_finite() && p.max_speed.is_finite()) || p.min_speed > p.max_speed {
            Some(format!("invalid speed range {}-{}", p.min_speed, p.max_speed))
        } else if p.smoothing_window == 0 {
            Some("smoothing window must be at least 1".to_string())
        } else {
            None
        };

        match problem {
            Some(details) => Err(ComputationError::InvalidParameters { details }.into()),
            None => Ok(()),
        }
    }
}

/// Motion samples per segment, and whether it had to be raised to one
pub fn segment_frame_count(segment_duration: f64, frame_rate: f64) -> (usize, bool) {
    let frames = (segment_duration * frame_rate).round();
    if frames < 1.0 {
        (1, true)
    } else {
        (frames as usize, false)
    }
}

/// Mean motion per window mapped linearly onto `[min_speed, max_speed]`
///
/// Normalization uses the global minimum and maximum of the whole sequence.
/// The last window may be shorter; it is never dropped.
pub fn window_speeds(motion: &MotionSequence, window: usize, min_speed: f64, max_speed: f64) -> Vec<f64> {
    let Some((gmin, gmax)) = motion.bounds() else {
        return Vec::new();
    };
    let denom = (gmax - gmin) + NORMALIZATION_EPSILON;
    let span = max_speed - min_speed;

    motion
        .as_slice()
        .chunks(window.max(1))
        .map(|chunk| {
            let mean = chunk.iter().sum::<f64>() / chunk.len() as f64;
            min_speed + ((mean - gmin) / denom) * span
        })
        .collect()
}

/// Limit each step to `max_ratio` of the previous clamped value
///
/// The anchor is the previous output, so a run of large jumps compounds.
pub fn clamp_jumps(values: &[f64], max_ratio: f64) -> Vec<f64> {
    values
        .iter()
        .fold(Vec::with_capacity(values.len()), |mut out, &curr| {
            let next = match out.last() {
                None => curr,
                Some(&prev) => {
                    let max_delta = max_ratio * prev.abs();
                    let delta = curr - prev;
                    if delta.abs() > max_delta {
                        prev + delta.signum() * max_delta
                    } else {
                        curr
                    }
                }
            };
            out.push(next);
            out
        })
}

/// Centered moving average with edge replication; output length equals input length
///
/// Inputs shorter than the window are returned unchanged.
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() < window {
        return values.to_vec();
    }

    let pad = window / 2;
    let first = values[0];
    let last = values[values.len() - 1];

    let padded: Vec<f64> = std::iter::repeat(first)
        .take(pad)
        .chain(values.iter().copied())
        .chain(std::iter::repeat(last).take(pad))
        .collect();

    padded
        .windows(window)
        .take(values.len())
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn builder(min_speed: f64, max_speed: f64) -> SpeedCurveBuilder {
        SpeedCurveBuilder::new(CurveParams {
            segment_duration: 0.5,
            min_speed,
            max_speed,
            ..CurveParams::default()
        })
    }

    fn low_then_high(len: usize) -> MotionSequence {
        (0..len)
            .map(|i| if i < len / 2 { 0.2 } else { 5.0 })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_curve_length_is_ceil_of_windows() {
        let builder = builder(0.8, 1.2);
        for (len, expected) in [(0, 0), (1, 1), (14, 1), (15, 1), (16, 2), (300, 20), (301, 21)] {
            let motion: MotionSequence = (0..len).map(|i| (i % 7) as f64).collect::<Vec<_>>().into();
            let curve = builder.build(&motion, 30.0).unwrap();
            assert_eq!(curve.len(), expected, "motion length {}", len);
            assert_eq!(curve.segment_frame_count, 15);
        }
    }

    #[test]
    fn test_constant_motion_maps_to_min_speed() {
        let motion: MotionSequence = vec![3.0; 90].into();
        let curve = builder(0.8, 1.2).build(&motion, 30.0).unwrap();

        assert_eq!(curve.len(), 6);
        for segment in curve.iter() {
            assert!((segment.raw_speed - 0.8).abs() < 1e-9);
            assert!((segment.clamped_speed - 0.8).abs() < 1e-9);
            assert!((segment.smoothed_speed - 0.8).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extremes_map_to_range_ends() {
        let motion: MotionSequence = vec![0.0; 15].into_iter().chain(vec![10.0; 15]).collect::<Vec<_>>().into();
        let raw = window_speeds(&motion, 15, 0.5, 2.0);
        assert_eq!(raw.len(), 2);
        assert!((raw[0] - 0.5).abs() < 1e-9);
        assert!((raw[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_trailing_window_is_kept() {
        let motion: MotionSequence = vec![0.0, 0.0, 0.0, 4.0].into();
        let raw = window_speeds(&motion, 3, 1.0, 2.0);
        assert_eq!(raw.len(), 2);
        assert!((raw[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_compounds_from_previous_output() {
        let clamped = clamp_jumps(&[1.0, 2.0, 2.0, 2.0], 0.2);
        let expected = [1.0, 1.2, 1.44, 1.728];
        for (got, want) in clamped.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{} vs {}", got, want);
        }

        // Anchored on 1.2, not on the raw 2.0
        let clamped = clamp_jumps(&[1.0, 2.0, 1.3], 0.2);
        assert!((clamped[2] - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_limits_drops_too() {
        let clamped = clamp_jumps(&[2.0, 0.5], 0.2);
        assert!((clamped[1] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_bound_holds_for_random_curves() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..50 {
            let values: Vec<f64> = (0..40).map(|_| rng.gen_range(0.25..4.0)).collect();
            let clamped = clamp_jumps(&values, 0.2);
            assert_eq!(clamped.len(), values.len());
            assert_eq!(clamped[0], values[0]);
            for pair in clamped.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                assert!((curr - prev).abs() <= 0.2 * prev.abs() + 1e-9);
            }
        }
    }

    #[test]
    fn test_smoothing_short_input_is_identity() {
        assert_eq!(smooth(&[1.0, 2.0, 3.0, 4.0], 5), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(smooth(&[], 5).is_empty());
    }

    #[test]
    fn test_smoothing_replicates_edges() {
        let smoothed = smooth(&[1.0, 1.0, 1.0, 1.0, 1.0, 6.0], 5);
        let expected = [1.0, 1.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(smoothed.len(), expected.len());
        for (got, want) in smoothed.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smoothing_preserves_length() {
        for len in 0..20 {
            let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
            assert_eq!(smooth(&values, 5).len(), len);
        }
    }

    #[test]
    fn test_low_then_high_motion_ramps_up() {
        let curve = builder(0.8, 1.2).build(&low_then_high(300), 30.0).unwrap();
        let speeds = curve.speeds();

        assert_eq!(speeds.len(), 20);
        assert!(speeds[0] < 0.85, "first speed {}", speeds[0]);
        assert!(speeds[19] > 1.15, "last speed {}", speeds[19]);

        for pair in speeds.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "curve should not dip: {:?}", speeds);
            assert!((pair[1] - pair[0]).abs() <= 0.2 * pair[0] + 1e-9);
        }

        for segment in curve.iter() {
            assert!((segment.start_time - segment.index as f64 * 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sub_frame_segment_is_clamped_to_one_frame() {
        let params = CurveParams {
            segment_duration: 0.01,
            ..CurveParams::default()
        };
        let motion: MotionSequence = vec![1.0, 2.0, 3.0].into();
        let curve = SpeedCurveBuilder::new(params).build(&motion, 30.0).unwrap();

        assert!(curve.window_clamped);
        assert_eq!(curve.segment_frame_count, 1);
        assert_eq!(curve.len(), 3);
        assert!((curve.segment_duration - 1.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_motion_gives_empty_curve() {
        let curve = builder(0.8, 1.2).build(&MotionSequence::default(), 30.0).unwrap();
        assert!(curve.is_empty());
        assert!(!curve.window_clamped);
    }

    #[test]
    fn test_bad_frame_rate_is_rejected() {
        let err = builder(0.8, 1.2).build(&low_then_high(10), 0.0).unwrap_err();
        assert_eq!(err.kind(), "computation");
    }

    #[test]
    fn test_segment_frame_count_rounds() {
        assert_eq!(segment_frame_count(0.5, 30.0), (15, false));
        assert_eq!(segment_frame_count(0.5, 29.97), (15, false));
        assert_eq!(segment_frame_count(0.02, 30.0), (1, false));
        assert_eq!(segment_frame_count(0.01, 30.0), (1, true));
    }
}
