use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::config::{MotionConfig, ToolsConfig};
use crate::error::{InputError, Result, ToolExecutionError};
use crate::video::types::{GrayFrame, MediaInfo};

/// Sequential access to the decoded frames of one video
pub trait FrameSource: Send {
    /// Frames per second of the source
    fn frame_rate(&self) -> f64;

    /// Next frame in native order, or `None` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<GrayFrame>>;
}

/// Opens frame sources for video files
pub trait FrameDecoder: Send + Sync {
    fn open(&self, path: &Path, info: &MediaInfo) -> Result<Box<dyn FrameSource>>;
}

/// In-memory frame source, handy for synthetic input
pub struct MemoryFrameSource {
    fps: f64,
    frames: VecDeque<GrayFrame>,
}

impl MemoryFrameSource {
    pub fn new(fps: f64, frames: Vec<GrayFrame>) -> Self {
        Self {
            fps,
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        Ok(self.frames.pop_front())
    }
}

/// Decodes videos through ffmpeg into downscaled 8-bit gray frames
#[derive(Debug, Clone)]
pub struct FfmpegFrameDecoder {
    ffmpeg: String,
    analysis_width: u32,
}

impl FfmpegFrameDecoder {
    pub fn new(tools: &ToolsConfig, motion: &MotionConfig) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            analysis_width: motion.analysis_width,
        }
    }
}

impl FrameDecoder for FfmpegFrameDecoder {
    fn open(&self, path: &Path, info: &MediaInfo) -> Result<Box<dyn FrameSource>> {
        let (width, height) = info.analysis_size(self.analysis_width);
        if width == 0 || height == 0 {
            return Err(InputError::InvalidVideo {
                path: path.display().to_string(),
                reason: format!("unusable frame size {}x{}", info.width, info.height),
            }.into());
        }

        let reader = FfmpegFrameReader::spawn(&self.ffmpeg, path, width, height, info.fps)?;
        Ok(Box::new(reader))
    }
}

/// Bytes of decoder diagnostics kept for error reports
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Reads raw gray frames from an ffmpeg child process
///
/// stderr is drained on a helper thread for the whole life of the child, so a
/// chatty decoder can never stall the frame pipe.
pub struct FfmpegFrameReader {
    tool: String,
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    fps: f64,
    frames_read: usize,
    finished: bool,
}

impl FfmpegFrameReader {
    pub fn spawn(ffmpeg: &str, path: &Path, width: u32, height: u32, fps: f64) -> Result<Self> {
        debug!("Decoding {:?} at {}x{} gray for motion analysis", path, width, height);

        let mut child = Command::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .arg("-vf")
            .arg(format!("scale={}:{},format=gray", width, height))
            .args([
                "-vsync", "passthrough",
                "-an",
                "-f", "rawvideo",
                "-pix_fmt", "gray",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolExecutionError::LaunchFailed {
                tool: ffmpeg.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ToolExecutionError::LaunchFailed {
            tool: ffmpeg.to_string(),
            reason: "stdout was not captured".to_string(),
        })?;

        let stderr = child.stderr.take().map(|pipe| {
            std::thread::spawn(move || read_tail(pipe, STDERR_TAIL_BYTES))
        });

        Ok(Self {
            tool: ffmpeg.to_string(),
            child,
            stdout,
            stderr,
            width,
            height,
            fps,
            frames_read: 0,
            finished: false,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reap the child and surface a failing exit status
    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(ToolExecutionError::NonZeroExit {
                tool: self.tool.clone(),
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            }.into());
        }

        debug!("Decoder finished after {} frames", self.frames_read);
        Ok(())
    }
}

impl FrameSource for FfmpegFrameReader {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.frame_len()];
        let filled = read_full(&mut self.stdout, &mut buffer)?;

        if filled < buffer.len() {
            if filled > 0 {
                warn!("Dropping truncated trailing frame ({} of {} bytes)", filled, buffer.len());
            }
            self.finish()?;
            return Ok(None);
        }

        self.frames_read += 1;
        Ok(GrayFrame::from_gray_bytes(self.width, self.height, buffer))
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read `reader` to the end, keeping only the last `limit` bytes as text
fn read_tail<R: Read>(mut reader: R, limit: usize) -> String {
    let mut tail: VecDeque<u8> = VecDeque::with_capacity(limit);
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend(&chunk[..n]);
                let excess = tail.len().saturating_sub(limit);
                tail.drain(..excess);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(tail.make_contiguous()).into_owned()
}

/// Fill `buffer` as far as the stream allows, returning the byte count
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_memory_source_yields_in_order() {
        let frames = vec![
            GrayFrame::new_filled(2, 2, 1),
            GrayFrame::new_filled(2, 2, 2),
        ];
        let mut source = MemoryFrameSource::new(24.0, frames);

        assert_eq!(source.frame_rate(), 24.0);
        assert_eq!(source.next_frame().unwrap().unwrap().get(0, 0), 1);
        assert_eq!(source.next_frame().unwrap().unwrap().get(0, 0), 2);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_read_full_reports_short_reads() {
        let mut reader = Cursor::new(vec![7u8; 10]);
        let mut buffer = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buffer).unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buffer).unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buffer).unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_read_tail_keeps_last_bytes() {
        let text = format!("{}last words", "x".repeat(10_000));
        let tail = read_tail(Cursor::new(text.into_bytes()), 10);
        assert_eq!(tail, "last words");

        assert_eq!(read_tail(Cursor::new(b"short".to_vec()), 64), "short");
    }

    /// Install `body` as an executable stand-in for ffmpeg
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    /// Spawn, retrying while a freshly written script is still busy
    #[cfg(unix)]
    fn spawn_fake(script: &str, width: u32, height: u32) -> FfmpegFrameReader {
        for _ in 0..20 {
            if let Ok(reader) = FfmpegFrameReader::spawn(script, Path::new("in.mp4"), width, height, 30.0) {
                return reader;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        panic!("could not start {}", script);
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_decoder_does_not_stall_frames() {
        let dir = tempfile::tempdir().unwrap();
        // Far more diagnostics than a pipe buffer holds, then two 2x2 frames
        let script = fake_ffmpeg(
            dir.path(),
            "head -c 262144 /dev/zero | tr '\\0' E >&2\nprintf 'abcdefgh'",
        );
        let mut reader = spawn_fake(&script, 2, 2);

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let mut frames = Vec::new();
            let result = loop {
                match reader.next_frame() {
                    Ok(Some(frame)) => frames.push(frame.as_raw().to_vec()),
                    Ok(None) => break Ok(frames),
                    Err(e) => break Err(e.to_string()),
                }
            };
            let _ = tx.send(result);
        });

        let frames = rx
            .recv_timeout(std::time::Duration::from_secs(30))
            .expect("frame reader stalled")
            .unwrap();
        assert_eq!(frames, vec![b"abcd".to_vec(), b"efgh".to_vec()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_decoder_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ffmpeg(dir.path(), "printf 'ab'\necho 'corrupt packet' >&2\nexit 3");
        let mut reader = spawn_fake(&script, 2, 2);

        let err = reader.next_frame().unwrap_err();
        assert_eq!(err.kind(), "tool");
        assert!(err.to_string().contains("corrupt packet"), "{}", err);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_ffmpeg_is_tool_error() {
        let result = FfmpegFrameReader::spawn(
            "definitely-not-a-real-ffmpeg-binary",
            Path::new("in.mp4"),
            32,
            32,
            30.0,
        );
        match result {
            Err(err) => assert_eq!(err.kind(), "tool"),
            Ok(_) => panic!("spawn should fail"),
        }
    }
}
