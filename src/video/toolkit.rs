use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::{EncodingConfig, ToolsConfig};
use crate::error::Result;
use crate::render::SegmentJob;
use crate::video::command::{run_tool, FfmpegCommand};
use crate::video::probe::{parse_probe_output, PROBE_ARGS};
use crate::video::types::MediaInfo;

/// The transcoding/probing capability the pipeline relies on
///
/// Implementations are blocking; the pipeline calls them from worker threads.
pub trait MediaToolkit: Send + Sync {
    /// Duration, frame rate, dimensions and audio presence of `input`
    fn probe(&self, input: &Path) -> Result<MediaInfo>;

    /// Trim `input` to the job's window, re-time it and encode to `output`
    fn render_segment(&self, input: &Path, job: &SegmentJob, output: &Path) -> Result<()>;

    /// Stream-copy the artifacts listed in a concat list file into `output`
    fn concat(&self, list_file: &Path, output: &Path) -> Result<()>;
}

/// [`MediaToolkit`] backed by the ffmpeg and ffprobe command-line tools
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    tools: ToolsConfig,
    encoding: EncodingConfig,
}

impl FfmpegToolkit {
    pub fn new(tools: ToolsConfig, encoding: EncodingConfig) -> Self {
        Self { tools, encoding }
    }

    /// Whether the configured ffmpeg binary can be executed
    pub fn check_available(&self) -> bool {
        Command::new(&self.tools.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// The ffmpeg invocation that renders one segment
    pub fn segment_command(&self, input: &Path, job: &SegmentJob, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&self.tools.ffmpeg, input, output)
            .seek(job.start)
            .input_duration(job.duration);

        cmd = match job.audio_filter() {
            Some(audio_filter) => cmd
                .filter_complex(format!("[0:v]{}[v];[0:a]{}[a]", job.video_filter(), audio_filter))
                .map("[v]")
                .map("[a]")
                .video_codec(&self.encoding.video_codec)
                .audio_codec(&self.encoding.audio_codec),
            None => cmd
                .video_filter(job.video_filter())
                .no_audio()
                .video_codec(&self.encoding.video_codec),
        };

        cmd = cmd.pixel_format(&self.encoding.pixel_format);
        if let Some(preset) = &self.encoding.preset {
            cmd = cmd.preset(preset);
        }
        if let Some(crf) = self.encoding.crf {
            cmd = cmd.crf(crf);
        }
        cmd
    }

    /// The ffmpeg invocation that concatenates without re-encoding
    pub fn concat_command(&self, list_file: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(&self.tools.ffmpeg, list_file, output)
            .input_arg("-f")
            .input_arg("concat")
            .input_arg("-safe")
            .input_arg("0")
            .stream_copy()
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn probe(&self, input: &Path) -> Result<MediaInfo> {
        let mut cmd = Command::new(&self.tools.ffprobe);
        cmd.args(PROBE_ARGS).arg(input);

        let output = run_tool(&self.tools.ffprobe, &mut cmd)?;
        let info = parse_probe_output(&input.display().to_string(), &output.stdout)?;

        debug!("Probed {:?}: {:.2}s @ {:.3} fps, {}x{}, audio: {}",
               input, info.duration, info.fps, info.width, info.height, info.has_audio);
        Ok(info)
    }

    fn render_segment(&self, input: &Path, job: &SegmentJob, output: &Path) -> Result<()> {
        self.segment_command(input, job, output).run()?;
        Ok(())
    }

    fn concat(&self, list_file: &Path, output: &Path) -> Result<()> {
        self.concat_command(list_file, output).run()?;
        Ok(())
    }
}
