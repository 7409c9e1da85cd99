use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

/// Scratch directory holding the per-segment artifacts of one render
///
/// The directory and everything in it is removed when the workspace is dropped,
/// whichever way the render ends.
pub struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    /// Create a fresh workspace, under `parent` if given, else the system temp dir
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("speed_ramp_");

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        debug!("Render workspace: {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Artifact path for a segment
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("seg_{:03}.mp4", index))
    }

    /// Location of the concat demuxer list
    pub fn concat_list_path(&self) -> PathBuf {
        self.dir.path().join("concat_list.txt")
    }

    /// Remove the workspace now, logging instead of failing
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove render workspace {:?}: {}", path, e);
        }
    }
}
