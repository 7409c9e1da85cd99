use rayon::prelude::*;

use crate::config::MotionConfig;
use crate::error::{ComputationError, Result};
use crate::video::types::GrayFrame;

/// Dense per-pixel motion between two frames
#[derive(Debug, Clone)]
pub struct FlowField {
    width: u32,
    height: u32,
    vectors: Vec<(f32, f32)>,
}

impl FlowField {
    pub fn new(width: u32, height: u32, vectors: Vec<(f32, f32)>) -> Self {
        debug_assert_eq!(vectors.len(), width as usize * height as usize);
        Self { width, height, vectors }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Displacement (dx, dy) at a pixel
    pub fn at(&self, x: u32, y: u32) -> (f32, f32) {
        self.vectors[y as usize * self.width as usize + x as usize]
    }

    /// Mean vector magnitude over the whole frame; 0.0 for an empty field
    pub fn mean_magnitude(&self) -> f64 {
        if self.vectors.is_empty() {
            return 0.0;
        }

        let total: f64 = self.vectors
            .par_iter()
            .map(|&(dx, dy)| (dx as f64).hypot(dy as f64))
            .sum();
        total / self.vectors.len() as f64
    }
}

/// Dense motion estimation between two frames of equal dimensions
pub trait FlowEstimator: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Compute the dense motion field from `prev` to `next`
    fn estimate(&self, prev: &GrayFrame, next: &GrayFrame) -> Result<FlowField>;

    /// Scalar motion intensity for a frame pair
    ///
    /// Defaults to the mean flow magnitude. Any reducer works as long as it
    /// grows with overall motion.
    fn motion_intensity(&self, prev: &GrayFrame, next: &GrayFrame) -> Result<f64> {
        Ok(self.estimate(prev, next)?.mean_magnitude())
    }
}

/// Dense Lucas–Kanade optical flow
///
/// Every pixel solves the 2x2 brightness-constancy system over a square window.
/// Window sums come from integral images, so cost does not depend on the radius.
#[derive(Debug, Clone)]
pub struct LucasKanadeFlow {
    window_radius: u32,
    min_determinant: f64,
}

impl LucasKanadeFlow {
    pub fn new(window_radius: u32, min_determinant: f64) -> Self {
        Self { window_radius, min_determinant }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.window_radius, config.min_determinant)
    }
}

impl Default for LucasKanadeFlow {
    fn default() -> Self {
        Self::from_config(&MotionConfig::default())
    }
}

impl FlowEstimator for LucasKanadeFlow {
    fn name(&self) -> &str {
        "lucas-kanade"
    }

    fn estimate(&self, prev: &GrayFrame, next: &GrayFrame) -> Result<FlowField> {
        if prev.dimensions() != next.dimensions() {
            return Err(ComputationError::DimensionMismatch {
                expected: prev.dimensions(),
                actual: next.dimensions(),
            }.into());
        }

        let (width, height) = prev.dimensions();
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 {
            return Ok(FlowField::new(width, height, Vec::new()));
        }

        let a = prev.as_raw();
        let b = next.as_raw();

        // Spatial gradients are taken on the mean of both frames
        let mean = |x: usize, y: usize| (a[y * w + x] as f64 + b[y * w + x] as f64) * 0.5;

        let mut terms = vec![[0.0f64; 5]; w * h];
        terms.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let up = y.saturating_sub(1);
            let down = (y + 1).min(h - 1);
            for (x, t) in row.iter_mut().enumerate() {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(w - 1);

                let ix = (mean(right, y) - mean(left, y)) / (right - left).max(1) as f64;
                let iy = (mean(x, down) - mean(x, up)) / (down - up).max(1) as f64;
                let it = b[y * w + x] as f64 - a[y * w + x] as f64;

                *t = [ix * ix, ix * iy, iy * iy, ix * it, iy * it];
            }
        });

        let tables: Vec<Integral> = (0..5)
            .into_par_iter()
            .map(|k| Integral::new(&terms, k, w, h))
            .collect();

        let r = self.window_radius as usize;
        let min_det = self.min_determinant;
        let mut vectors = vec![(0.0f32, 0.0f32); w * h];

        vectors.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let y0 = y.saturating_sub(r);
            let y1 = (y + r + 1).min(h);
            for (x, out) in row.iter_mut().enumerate() {
                let x0 = x.saturating_sub(r);
                let x1 = (x + r + 1).min(w);

                let sxx = tables[0].sum(x0, y0, x1, y1);
                let sxy = tables[1].sum(x0, y0, x1, y1);
                let syy = tables[2].sum(x0, y0, x1, y1);
                let sxt = tables[3].sum(x0, y0, x1, y1);
                let syt = tables[4].sum(x0, y0, x1, y1);

                let det = sxx * syy - sxy * sxy;
                if det > min_det {
                    let u = (sxy * syt - syy * sxt) / det;
                    let v = (sxy * sxt - sxx * syt) / det;
                    *out = (u as f32, v as f32);
                }
            }
        });

        Ok(FlowField::new(width, height, vectors))
    }
}

/// Summed-area table over one component of the per-pixel terms
struct Integral {
    stride: usize,
    data: Vec<f64>,
}

impl Integral {
    fn new(terms: &[[f64; 5]], component: usize, w: usize, h: usize) -> Self {
        let stride = w + 1;
        let mut data = vec![0.0; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0.0;
            for x in 0..w {
                row_sum += terms[y * w + x][component];
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row_sum;
            }
        }
        Self { stride, data }
    }

    /// Sum over `[x0, x1) x [y0, y1)`
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
        let s = self.stride;
        self.data[y1 * s + x1] - self.data[y0 * s + x1] - self.data[y1 * s + x0]
            + self.data[y0 * s + x0]
    }
}
