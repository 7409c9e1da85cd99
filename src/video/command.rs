//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{Result, ToolExecutionError};

/// Builder for FFmpeg commands
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    program: String,
    input: PathBuf,
    output: PathBuf,
    /// Arguments placed before `-i`
    input_args: Vec<String>,
    /// Arguments placed after `-i`
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(program: impl Into<String>, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Seek in the input before decoding starts
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.6}", seconds))
    }

    /// Limit how much of the input is read
    pub fn input_duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.6}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter:v").output_arg(filter)
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    pub fn map(self, stream: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(stream)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Copy every stream without re-encoding
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Full argument list, without the program name
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.display().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.display().to_string());
        args
    }

    /// Run to completion, failing on a non-zero exit status
    pub fn run(&self) -> Result<Output> {
        let args = self.build_args();
        debug!("Running {} {}", self.program, args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        run_tool(&self.program, &mut cmd)
    }
}

/// Run an external tool, capturing output and mapping failures
pub fn run_tool(tool: &str, cmd: &mut Command) -> Result<Output> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ToolExecutionError::LaunchFailed {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ToolExecutionError::NonZeroExit {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }.into());
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_args_precede_input() {
        let args = FfmpegCommand::new("ffmpeg", "in.mp4", "out.mp4")
            .seek(1.5)
            .input_duration(0.5)
            .video_codec("libx264")
            .build_args();

        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        let codec_pos = args.iter().position(|a| a == "-c:v").unwrap();

        assert!(ss_pos < input_pos);
        assert!(t_pos < input_pos);
        assert!(codec_pos > input_pos);
        assert_eq!(args[ss_pos + 1], "1.500000");
        assert_eq!(args.last().unwrap(), "out.mp4");
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_missing_program_is_launch_failure() {
        let err = FfmpegCommand::new("definitely-not-a-real-ffmpeg-binary", "a", "b")
            .run()
            .unwrap_err();
        assert_eq!(err.kind(), "tool");
    }
}
