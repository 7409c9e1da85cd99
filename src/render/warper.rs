use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::curve::SpeedCurve;
use crate::error::{ComputationError, RenderError, Result};
use crate::render::tempo::{atempo_chain, tempo_cascade};
use crate::render::workspace::RenderWorkspace;
use crate::video::MediaToolkit;

/// One segment's render instructions
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentJob {
    pub index: usize,

    /// Source window start in seconds
    pub start: f64,

    /// Source window length in seconds
    pub duration: f64,

    /// Playback speed factor
    pub speed: f64,

    /// Audio tempo cascade; empty when the source has no audio
    pub tempo_steps: Vec<f64>,
}

impl SegmentJob {
    pub fn new(index: usize, start: f64, duration: f64, speed: f64, has_audio: bool) -> Self {
        let tempo_steps = if has_audio { tempo_cascade(speed) } else { Vec::new() };
        Self {
            index,
            start,
            duration,
            speed,
            tempo_steps,
        }
    }

    pub fn has_audio(&self) -> bool {
        !self.tempo_steps.is_empty()
    }

    /// Presentation timestamps are scaled by `1 / speed`
    pub fn video_filter(&self) -> String {
        format!("setpts={:.6}*PTS", 1.0 / self.speed)
    }

    pub fn audio_filter(&self) -> Option<String> {
        self.has_audio().then(|| atempo_chain(&self.tempo_steps))
    }

    /// Playback length after re-timing
    pub fn output_duration(&self) -> f64 {
        self.duration / self.speed
    }
}

/// An encoded, re-timed segment waiting for assembly
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    pub index: usize,
    pub path: PathBuf,
    pub source_start: f64,
    pub source_duration: f64,
    pub speed: f64,
}

impl RenderedSegment {
    pub fn output_duration(&self) -> f64 {
        self.source_duration / self.speed
    }
}

/// Renders every segment of a speed curve at its own speed
pub struct SegmentTimeWarper {
    toolkit: Arc<dyn MediaToolkit>,
    workers: usize,
}

impl SegmentTimeWarper {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, workers: usize) -> Self {
        Self {
            toolkit,
            workers: workers.max(1),
        }
    }

    /// Turn the curve into render jobs, in index order
    ///
    /// Entries starting at or beyond `total_duration` are dropped; the last kept
    /// window is shortened to end with the source.
    pub fn plan(curve: &SpeedCurve, total_duration: f64, has_audio: bool) -> Result<Vec<SegmentJob>> {
        let mut jobs = Vec::with_capacity(curve.len());

        for segment in curve.iter() {
            let start = segment.start_time;
            if start >= total_duration {
                debug!("Dropping {} curve entries past the end of the source", curve.len() - jobs.len());
                break;
            }

            let speed = segment.speed();
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ComputationError::InvalidSpeed {
                    index: segment.index,
                    speed,
                }.into());
            }

            let duration = if segment.end_time() > total_duration {
                total_duration - start
            } else {
                segment.duration
            };
            jobs.push(SegmentJob::new(segment.index, start, duration, speed, has_audio));
        }

        Ok(jobs)
    }

    /// Encode each job into the workspace
    ///
    /// With more than one worker, segments render concurrently; the returned list
    /// is always in job order. The first failure aborts the render.
    pub fn render(
        &self,
        input: &Path,
        jobs: &[SegmentJob],
        workspace: &RenderWorkspace,
    ) -> Result<Vec<RenderedSegment>> {
        info!("Rendering {} segments with {} worker(s)", jobs.len(), self.workers);

        let rendered = if self.workers <= 1 {
            jobs.iter()
                .map(|job| self.render_one(input, job, workspace))
                .collect::<Result<Vec<_>>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| RenderError::WorkerPool { reason: e.to_string() })?;

            pool.install(|| {
                jobs.par_iter()
                    .map(|job| self.render_one(input, job, workspace))
                    .collect::<Result<Vec<_>>>()
            })?
        };

        Ok(rendered)
    }

    fn render_one(&self, input: &Path, job: &SegmentJob, workspace: &RenderWorkspace) -> Result<RenderedSegment> {
        let path = workspace.segment_path(job.index);

        debug!("Segment {:03}: {:.3}s+{:.3}s at {:.4}x{}",
               job.index, job.start, job.duration, job.speed,
               if job.has_audio() { " (with audio)" } else { "" });

        if let Err(e) = self.toolkit.render_segment(input, job, &path) {
            let _ = std::fs::remove_file(&path);
            return Err(RenderError::EncodeFailed {
                index: job.index,
                reason: e.to_string(),
            }.into());
        }

        Ok(RenderedSegment {
            index: job.index,
            path,
            source_start: job.start,
            source_duration: job.duration,
            speed: job.speed,
        })
    }
}
