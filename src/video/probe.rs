//! ffprobe output parsing.

use serde::Deserialize;

use crate::error::{InputError, Result, ToolExecutionError};
use crate::video::types::MediaInfo;

/// Arguments that make ffprobe print format and stream info as JSON
pub const PROBE_ARGS: [&str; 6] = [
    "-v", "error",
    "-print_format", "json",
    "-show_format",
    "-show_streams",
];

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Parse ffprobe's JSON into [`MediaInfo`]
///
/// A missing video stream or a non-positive frame rate makes the input invalid.
pub fn parse_probe_output(path: &str, stdout: &[u8]) -> Result<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ToolExecutionError::UnparseableOutput {
            tool: "ffprobe".to_string(),
            reason: e.to_string(),
        })?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| InputError::InvalidVideo {
            path: path.to_string(),
            reason: "no video stream found".to_string(),
        })?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .filter(|fps| *fps > 0.0)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    if fps <= 0.0 {
        return Err(InputError::InvalidVideo {
            path: path.to_string(),
            reason: "could not determine frame rate".to_string(),
        }.into());
    }

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| InputError::InvalidVideo {
            path: path.to_string(),
            reason: "could not determine duration".to_string(),
        })?;

    Ok(MediaInfo {
        duration,
        fps,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio,
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => rate.parse().ok(),
    }
}
