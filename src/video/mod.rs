//! # Video Module
//!
//! Media handles plus the ffmpeg/ffprobe backed probing and transcoding toolkit.

pub mod command;
pub mod probe;
pub mod toolkit;
pub mod types;

pub use command::FfmpegCommand;
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use types::{GrayFrame, MediaInfo};
