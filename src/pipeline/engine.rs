use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    curve::{SpeedCurve, SpeedCurveBuilder, SpeedReport},
    error::{InputError, Result},
    motion::{flow_estimator, FfmpegFrameDecoder, FlowEstimator, FrameDecoder, MotionProfiler},
    render::{OutputAssembler, RenderWorkspace, SegmentTimeWarper},
    video::{FfmpegToolkit, MediaInfo, MediaToolkit},
};

/// Outcome of a full ramp run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampSummary {
    /// The curve and the settings that produced it
    pub report: SpeedReport,

    /// Segments actually encoded (curve entries past the source end are dropped)
    pub segments_rendered: usize,

    /// Probed source duration in seconds
    pub source_duration: f64,

    /// Sum of every rendered window's duration divided by its speed
    pub estimated_output_duration: f64,

    /// Where the result was published
    pub output: PathBuf,
}

/// Orchestrates the speed-ramp pipeline for one video at a time
///
/// The engine follows a strictly sequential pipeline:
/// 1. Probe - duration, frame rate and audio presence of the source
/// 2. Motion Analysis - one motion-intensity sample per frame pair
/// 3. Speed Curve - windowing, normalization, jump clamping, smoothing
/// 4. Segment Rendering - trim, re-time and encode every segment
/// 5. Assembly - stream-copy concatenation into the destination
///
/// Steps 1-3 alone make up [`RampEngine::analyze`].
#[derive(Clone)]
pub struct RampEngine {
    config: Config,
    decoder: Arc<dyn FrameDecoder>,
    flow: Arc<dyn FlowEstimator>,
    toolkit: Arc<dyn MediaToolkit>,
}

/// Everything the first three steps produce
struct Analysis {
    info: MediaInfo,
    curve: SpeedCurve,
    motion_samples: usize,
}

impl RampEngine {
    /// Create an engine backed by ffmpeg/ffprobe and the configured optical flow
    pub fn new(config: Config) -> Result<Self> {
        let decoder = Arc::new(FfmpegFrameDecoder::new(&config.tools, &config.motion));
        let flow = flow_estimator(&config.motion)?;
        let toolkit = Arc::new(FfmpegToolkit::new(config.tools.clone(), config.encoding.clone()));
        Self::with_backends(config, decoder, flow, toolkit)
    }

    /// Create an engine with caller-supplied collaborators
    pub fn with_backends(
        config: Config,
        decoder: Arc<dyn FrameDecoder>,
        flow: Arc<dyn FlowEstimator>,
        toolkit: Arc<dyn MediaToolkit>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            decoder,
            flow,
            toolkit,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compute the speed curve of `input` without rendering anything
    pub async fn analyze<P: AsRef<Path>>(&self, input: P) -> Result<SpeedReport> {
        let input = input.as_ref().to_path_buf();
        self.validate_input(&input)?;

        info!("🔍 Analyzing {:?}", input);

        let engine = self.clone();
        let report = run_blocking(move || {
            let analysis = engine.run_analysis(&input)?;
            Ok(engine.report(&analysis))
        }).await?;

        info!("✅ Analysis complete: {} segments", report.speeds.len());
        Ok(report)
    }

    /// Produce a speed-ramped copy of `input` at `output`
    pub async fn ramp<I, O>(&self, input: I, output: O) -> Result<RampSummary>
    where
        I: AsRef<Path>,
        O: AsRef<Path>,
    {
        let input = input.as_ref().to_path_buf();
        let output = output.as_ref().to_path_buf();
        self.validate_input(&input)?;
        self.validate_output(&output)?;

        info!("🎬 Starting speed ramp");
        info!("   Input: {:?}", input);
        info!("   Output: {:?}", output);
        info!("   Speed range: {:.2}x - {:.2}x, {:.2}s segments",
              self.config.ramp.min_speed, self.config.ramp.max_speed, self.config.ramp.segment_duration);

        let engine = self.clone();
        let summary = run_blocking(move || engine.run_ramp(&input, &output)).await?;

        info!("🎉 Speed ramp complete! Output saved to: {:?}", summary.output);
        info!("   {:.2}s source -> ~{:.2}s output", summary.source_duration, summary.estimated_output_duration);
        Ok(summary)
    }

    fn validate_input(&self, input: &Path) -> Result<()> {
        if !input.is_file() {
            return Err(InputError::NotFound {
                path: input.display().to_string(),
            }.into());
        }

        self.check_container(input)
    }

    /// The output container is chosen from the destination's extension
    fn validate_output(&self, output: &Path) -> Result<()> {
        self.check_container(output)
    }

    fn check_container(&self, path: &Path) -> Result<()> {
        if !self.config.input.is_allowed(path) {
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| "<none>".to_string());
            return Err(InputError::UnsupportedFormat { extension }.into());
        }

        Ok(())
    }

    fn run_analysis(&self, input: &Path) -> Result<Analysis> {
        // Pipeline Step 1: Probe
        info!("📋 Step 1: Probing source...");
        let info = self.toolkit.probe(input)?;
        info!("   {:.2}s @ {:.3} fps, {}x{}, audio: {}",
              info.duration, info.fps, info.width, info.height,
              if info.has_audio { "yes" } else { "no" });

        // Pipeline Step 2: Motion Analysis
        info!("🏃 Step 2: Measuring motion...");
        let mut source = self.decoder.open(input, &info)?;
        let motion = MotionProfiler::new(self.flow.clone()).profile(source.as_mut())?;

        // Pipeline Step 3: Speed Curve
        info!("📈 Step 3: Building speed curve...");
        let curve = SpeedCurveBuilder::from_config(&self.config.ramp).build(&motion, info.fps)?;
        if curve.window_clamped {
            warn!("   Segments were widened to one frame ({:.4}s)", curve.segment_duration);
        }
        debug!("   Speeds: {:?}", curve.speeds());
        info!("   {} segments of {} frames", curve.len(), curve.segment_frame_count);

        Ok(Analysis {
            info,
            curve,
            motion_samples: motion.len(),
        })
    }

    fn run_ramp(&self, input: &Path, output: &Path) -> Result<RampSummary> {
        let analysis = self.run_analysis(input)?;

        // Pipeline Step 4: Segment Rendering
        info!("🎞️  Step 4: Rendering segments...");
        let jobs = SegmentTimeWarper::plan(&analysis.curve, analysis.info.duration, analysis.info.has_audio)?;
        if jobs.len() < analysis.curve.len() {
            debug!("   {} of {} curve entries fall inside the source", jobs.len(), analysis.curve.len());
        }

        let workspace = RenderWorkspace::create(self.config.render.temp_dir.as_deref())?;
        let warper = SegmentTimeWarper::new(self.toolkit.clone(), self.config.render.effective_workers());
        let rendered = warper.render(input, &jobs, &workspace)?;

        // Pipeline Step 5: Assembly
        info!("📼 Step 5: Assembling output...");
        let segments_rendered = rendered.len();
        let output = OutputAssembler::new(self.toolkit.clone()).assemble(rendered, &workspace, output)?;
        workspace.cleanup();

        Ok(RampSummary {
            report: self.report(&analysis),
            segments_rendered,
            source_duration: analysis.info.duration,
            estimated_output_duration: jobs.iter().map(|job| job.output_duration()).sum(),
            output,
        })
    }

    fn report(&self, analysis: &Analysis) -> SpeedReport {
        SpeedReport {
            speeds: analysis.curve.speeds(),
            segment_duration: analysis.curve.segment_duration,
            min_speed: self.config.ramp.min_speed,
            max_speed: self.config.ramp.max_speed,
            frame_rate: analysis.info.fps,
            segment_frame_count: analysis.curve.segment_frame_count,
            window_clamped: analysis.curve.window_clamped,
            motion_samples: analysis.motion_samples,
        }
    }
}

/// Run blocking pipeline work off the async executor
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(std::io::Error::other)?
}
