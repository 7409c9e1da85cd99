use opencv::{
    core::{self, Mat, Scalar, Vec2f},
    prelude::*,
    video,
};

use crate::error::{ComputationError, RampError, Result, ToolExecutionError};
use crate::motion::flow::{FlowEstimator, FlowField};
use crate::video::types::GrayFrame;

/// Dense Farneback optical flow computed by OpenCV
#[derive(Debug, Clone)]
pub struct FarnebackFlow {
    pub pyr_scale: f64,
    pub levels: i32,
    pub window_size: i32,
    pub iterations: i32,
    pub poly_n: i32,
    pub poly_sigma: f64,
}

impl Default for FarnebackFlow {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            window_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

fn opencv_failed(e: opencv::Error) -> RampError {
    ToolExecutionError::BackendFailed {
        tool: "opencv".to_string(),
        reason: e.to_string(),
    }.into()
}

fn to_mat(frame: &GrayFrame) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    Ok(mat)
}

impl FlowEstimator for FarnebackFlow {
    fn name(&self) -> &str {
        "farneback"
    }

    fn estimate(&self, prev: &GrayFrame, next: &GrayFrame) -> Result<FlowField> {
        if prev.dimensions() != next.dimensions() {
            return Err(ComputationError::DimensionMismatch {
                expected: prev.dimensions(),
                actual: next.dimensions(),
            }.into());
        }

        let (width, height) = prev.dimensions();
        if width == 0 || height == 0 {
            return Ok(FlowField::new(width, height, Vec::new()));
        }

        let prev_mat = to_mat(prev).map_err(opencv_failed)?;
        let next_mat = to_mat(next).map_err(opencv_failed)?;
        let mut flow = Mat::default();

        video::calc_optical_flow_farneback(
            &prev_mat,
            &next_mat,
            &mut flow,
            self.pyr_scale,
            self.levels,
            self.window_size,
            self.iterations,
            self.poly_n,
            self.poly_sigma,
            0,
        )
        .map_err(opencv_failed)?;

        let vectors = flow
            .data_typed::<Vec2f>()
            .map_err(opencv_failed)?
            .iter()
            .map(|v| (v[0], v[1]))
            .collect();

        Ok(FlowField::new(width, height, vectors))
    }
}
