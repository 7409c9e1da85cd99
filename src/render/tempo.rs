/// Slowest factor a single `atempo` filter accepts
pub const MIN_TEMPO_STEP: f64 = 0.5;

/// Fastest factor a single `atempo` filter accepts
pub const MAX_TEMPO_STEP: f64 = 2.0;

/// Split a speed factor into tempo steps that each stay within `[0.5, 2.0]`
///
/// Whole 2.0x steps are taken while the remainder is above 2.0, whole 0.5x steps
/// while it is below 0.5, then one final step for what is left. The product of
/// the steps equals `speed`.
pub fn tempo_cascade(speed: f64) -> Vec<f64> {
    if !(speed.is_finite() && speed > 0.0) {
        return vec![speed];
    }

    let mut steps = Vec::new();
    let mut remaining = speed;

    while remaining > MAX_TEMPO_STEP {
        steps.push(MAX_TEMPO_STEP);
        remaining /= MAX_TEMPO_STEP;
    }
    while remaining < MIN_TEMPO_STEP {
        steps.push(MIN_TEMPO_STEP);
        remaining /= MIN_TEMPO_STEP;
    }
    steps.push(remaining);
    steps
}

/// Comma-joined `atempo` filter chain for the given steps
pub fn atempo_chain(steps: &[f64]) -> String {
    steps
        .iter()
        .map(|step| format!("atempo={:.6}", step))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(steps: &[f64]) -> f64 {
        steps.iter().product()
    }

    #[test]
    fn test_fast_speed_decomposition() {
        let steps = tempo_cascade(3.0);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], 2.0);
        assert!((steps[1] - 1.5).abs() < 1e-9);
        assert!((product(&steps) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_slow_speed_decomposition() {
        let steps = tempo_cascade(0.3);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], 0.5);
        assert!((steps[1] - 0.6).abs() < 1e-9);
        assert!((product(&steps) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_in_range_speed_is_single_step() {
        assert_eq!(tempo_cascade(1.0), vec![1.0]);
        assert_eq!(tempo_cascade(2.0), vec![2.0]);
        assert_eq!(tempo_cascade(0.5), vec![0.5]);
    }

    #[test]
    fn test_every_step_is_within_bounds() {
        for speed in [0.01, 0.1, 0.26, 0.49, 0.8, 1.2, 2.01, 7.5, 16.0, 100.0] {
            let steps = tempo_cascade(speed);
            for step in &steps {
                assert!((MIN_TEMPO_STEP..=MAX_TEMPO_STEP).contains(step), "{} in {:?}", step, steps);
            }
            assert!((product(&steps) - speed).abs() < 1e-6 * speed.max(1.0));
        }
    }

    #[test]
    fn test_atempo_chain_format() {
        assert_eq!(atempo_chain(&[2.0, 1.5]), "atempo=2.000000,atempo=1.500000");
        assert_eq!(atempo_chain(&[0.9]), "atempo=0.900000");
    }
}
