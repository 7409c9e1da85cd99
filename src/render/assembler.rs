use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AssemblyError, Result};
use crate::render::warper::RenderedSegment;
use crate::render::workspace::RenderWorkspace;
use crate::video::MediaToolkit;

/// Joins rendered segments, in index order, into the final output file
pub struct OutputAssembler {
    toolkit: Arc<dyn MediaToolkit>,
}

impl OutputAssembler {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { toolkit }
    }

    /// Concatenate `segments` into `output` without re-encoding
    ///
    /// The result is staged next to `output` and renamed into place, so a failed
    /// assembly never leaves a partial file at the destination.
    pub fn assemble(
        &self,
        mut segments: Vec<RenderedSegment>,
        workspace: &RenderWorkspace,
        output: &Path,
    ) -> Result<PathBuf> {
        if segments.is_empty() {
            return Err(AssemblyError::NoSegments.into());
        }

        segments.sort_by_key(|s| s.index);
        let mut seen = HashSet::with_capacity(segments.len());
        for segment in &segments {
            if !seen.insert(segment.index) {
                return Err(AssemblyError::DuplicateSegment { index: segment.index }.into());
            }
            if !segment.path.is_file() {
                return Err(AssemblyError::MissingSegment {
                    index: segment.index,
                    path: segment.path.display().to_string(),
                }.into());
            }
        }

        for segment in &segments {
            debug!("   {:03}: {:.3}s+{:.3}s at {:.4}x -> {:.3}s",
                   segment.index, segment.source_start, segment.source_duration,
                   segment.speed, segment.output_duration());
        }

        let list_path = workspace.concat_list_path();
        let paths = segments
            .iter()
            .map(|s| s.path.canonicalize())
            .collect::<std::io::Result<Vec<_>>>()?;
        std::fs::write(&list_path, concat_list(&paths))?;
        debug!("Wrote concat list with {} entries to {:?}", paths.len(), list_path);

        let staged = stage_next_to(output)?;
        self.toolkit
            .concat(&list_path, &staged)
            .map_err(|e| AssemblyError::ConcatFailed { reason: e.to_string() })?;

        staged.persist(output).map_err(|e| AssemblyError::PublishFailed {
            path: output.display().to_string(),
            reason: e.error.to_string(),
        })?;

        for segment in &segments {
            let _ = std::fs::remove_file(&segment.path);
        }

        let total: f64 = segments.iter().map(RenderedSegment::output_duration).sum();
        info!("Assembled {} segments ({:.2}s) into {:?}", segments.len(), total, output);

        Ok(output.to_path_buf())
    }
}

/// Concat demuxer list: one `file '<path>'` line per artifact, in order
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', "'\\''")))
        .collect()
}

/// A temporary file in the destination's directory, keeping its extension
/// so ffmpeg picks the same container format.
fn stage_next_to(output: &Path) -> Result<tempfile::TempPath> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let staged = tempfile::Builder::new()
        .prefix(".speed-ramp-")
        .suffix(&suffix)
        .tempfile_in(parent)
        .map_err(|e| AssemblyError::PublishFailed {
            path: output.display().to_string(),
            reason: e.to_string(),
        })?
        .into_temp_path();
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolkit;
    use tempfile::tempdir;

    fn rendered(workspace: &RenderWorkspace, index: usize, body: &str) -> RenderedSegment {
        let path = workspace.segment_path(index);
        std::fs::write(&path, body).unwrap();
        RenderedSegment {
            index,
            path,
            source_start: index as f64 * 0.5,
            source_duration: 0.5,
            speed: 1.0,
        }
    }

    #[test]
    fn test_assembles_in_index_order() {
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("out.mp4");
        let workspace = RenderWorkspace::create(None).unwrap();

        let segments = vec![
            rendered(&workspace, 2, "c"),
            rendered(&workspace, 0, "a"),
            rendered(&workspace, 1, "b"),
        ];

        let assembler = OutputAssembler::new(Arc::new(FakeToolkit::default()));
        let path = assembler.assemble(segments, &workspace, &output).unwrap();

        assert_eq!(path, output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "abc");
        assert!(!workspace.segment_path(0).exists());
    }

    #[test]
    fn test_empty_segment_list_is_an_error() {
        let out_dir = tempdir().unwrap();
        let workspace = RenderWorkspace::create(None).unwrap();
        let assembler = OutputAssembler::new(Arc::new(FakeToolkit::default()));

        let err = assembler
            .assemble(Vec::new(), &workspace, &out_dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, crate::RampError::Assembly(AssemblyError::NoSegments)));
    }

    #[test]
    fn test_missing_and_duplicate_segments_are_rejected() {
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("out.mp4");
        let workspace = RenderWorkspace::create(None).unwrap();
        let assembler = OutputAssembler::new(Arc::new(FakeToolkit::default()));

        let mut missing = rendered(&workspace, 1, "b");
        missing.path = workspace.path().join("nope.mp4");
        let err = assembler
            .assemble(vec![rendered(&workspace, 0, "a"), missing], &workspace, &output)
            .unwrap_err();
        assert!(matches!(err, crate::RampError::Assembly(AssemblyError::MissingSegment { index: 1, .. })));

        let err = assembler
            .assemble(vec![rendered(&workspace, 0, "a"), rendered(&workspace, 0, "a")], &workspace, &output)
            .unwrap_err();
        assert!(matches!(err, crate::RampError::Assembly(AssemblyError::DuplicateSegment { index: 0 })));
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_concat_leaves_no_output() {
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("out.mp4");
        let workspace = RenderWorkspace::create(None).unwrap();
        let assembler = OutputAssembler::new(Arc::new(FakeToolkit::failing_concat()));

        let err = assembler
            .assemble(vec![rendered(&workspace, 0, "a")], &workspace, &output)
            .unwrap_err();

        assert_eq!(err.kind(), "assembly");
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }
}
