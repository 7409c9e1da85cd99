//! Segment rendering and final assembly
//!
//! Each curve entry becomes a [`SegmentJob`]: the source window trimmed on the
//! input side, video re-timed with `setpts`, audio re-timed with a cascade of
//! `atempo` filters. Artifacts live in a [`RenderWorkspace`] and are joined by
//! the [`OutputAssembler`] with the concat demuxer.

pub mod assembler;
pub mod tempo;
pub mod warper;
pub mod workspace;

pub use assembler::{concat_list, OutputAssembler};
pub use tempo::{atempo_chain, tempo_cascade};
pub use warper::{RenderedSegment, SegmentJob, SegmentTimeWarper};
pub use workspace::RenderWorkspace;
