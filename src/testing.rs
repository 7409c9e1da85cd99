//! Test doubles for the external collaborators

use std::path::Path;
use std::sync::Mutex;

use crate::error::{Result, ToolExecutionError};
use crate::motion::{FlowEstimator, FlowField, FrameDecoder, FrameSource, MemoryFrameSource};
use crate::render::SegmentJob;
use crate::video::{GrayFrame, MediaInfo, MediaToolkit};

pub(crate) fn media_info(duration: f64, fps: f64, has_audio: bool) -> MediaInfo {
    MediaInfo {
        duration,
        fps,
        width: 64,
        height: 36,
        has_audio,
    }
}

fn tool_failure(what: &str) -> crate::RampError {
    ToolExecutionError::NonZeroExit {
        tool: "fake-ffmpeg".to_string(),
        status: "exit status: 1".to_string(),
        stderr: format!("{} failed", what),
    }.into()
}

/// In-process toolkit: segments are small text files, concat joins them
pub(crate) struct FakeToolkit {
    info: MediaInfo,
    fail_segment: Option<usize>,
    fail_concat: bool,
    jobs: Mutex<Vec<SegmentJob>>,
}

impl Default for FakeToolkit {
    fn default() -> Self {
        Self::with_info(media_info(10.0, 30.0, true))
    }
}

impl FakeToolkit {
    pub(crate) fn with_info(info: MediaInfo) -> Self {
        Self {
            info,
            fail_segment: None,
            fail_concat: false,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_segment(index: usize) -> Self {
        Self {
            fail_segment: Some(index),
            ..Self::default()
        }
    }

    pub(crate) fn failing_concat() -> Self {
        Self {
            fail_concat: true,
            ..Self::default()
        }
    }

    pub(crate) fn rendered_jobs(&self) -> Vec<SegmentJob> {
        let mut jobs = self.jobs.lock().unwrap().clone();
        jobs.sort_by_key(|job| job.index);
        jobs
    }

    pub(crate) fn rendered_indices(&self) -> Vec<usize> {
        self.rendered_jobs().iter().map(|job| job.index).collect()
    }
}

impl MediaToolkit for FakeToolkit {
    fn probe(&self, _input: &Path) -> Result<MediaInfo> {
        Ok(self.info.clone())
    }

    fn render_segment(&self, _input: &Path, job: &SegmentJob, output: &Path) -> Result<()> {
        if self.fail_segment == Some(job.index) {
            // Leave a partial artifact behind like a crashed encoder would
            std::fs::write(output, b"partial")?;
            return Err(tool_failure("segment"));
        }

        std::fs::write(output, format!("[{}@{:.3}]", job.index, job.speed))?;
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }

    fn concat(&self, list_file: &Path, output: &Path) -> Result<()> {
        if self.fail_concat {
            return Err(tool_failure("concat"));
        }

        let list = std::fs::read_to_string(list_file)?;
        let mut joined = Vec::new();
        for line in list.lines() {
            let quoted = line.trim_start_matches("file ").trim_matches('\'');
            let path = quoted.replace("'\\''", "'");
            joined.extend(std::fs::read(path)?);
        }
        std::fs::write(output, joined)?;
        Ok(())
    }
}

/// Frames whose top-left pixel carries the motion reported for the pair ending at them
pub(crate) struct ScriptedDecoder {
    values: Vec<u8>,
}

impl ScriptedDecoder {
    pub(crate) fn new(values: Vec<u8>) -> Self {
        Self { values }
    }

    /// `frames` frames: calm for the first half, busy for the second
    pub(crate) fn low_then_high(frames: usize) -> Self {
        Self::new((0..frames).map(|i| if i <= frames / 2 { 1 } else { 40 }).collect())
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn open(&self, _path: &Path, info: &MediaInfo) -> Result<Box<dyn FrameSource>> {
        let frames = self
            .values
            .iter()
            .map(|&v| GrayFrame::new_filled(8, 8, v))
            .collect();
        Ok(Box::new(MemoryFrameSource::new(info.fps, frames)))
    }
}

/// Reads motion straight off the next frame's pixel value
pub(crate) struct PixelMotion;

impl FlowEstimator for PixelMotion {
    fn name(&self) -> &str {
        "pixel-motion"
    }

    fn estimate(&self, _prev: &GrayFrame, next: &GrayFrame) -> Result<FlowField> {
        Ok(FlowField::new(1, 1, vec![(next.get(0, 0) as f32, 0.0)]))
    }
}
