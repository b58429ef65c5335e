//! Per-test artifact directories
//!
//! Every panzoom test renders its frames into a fresh temporary directory.
//! The directory is removed when the [`ArtifactDir`] is finished or dropped,
//! unless artifacts are kept for inspection.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;

use crate::common::config::ViscatConfig;
use crate::common::{Error, Result};

/// Scoped directory holding the frames rendered by one test
pub struct ArtifactDir {
    dir: TempDir,
    keep: bool,
}

impl ArtifactDir {
    /// Create a fresh directory with the given name prefix
    pub fn create(prefix: &str, keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        tracing::debug!("Writing artifacts to {}", dir.path().display());
        Ok(Self { dir, keep })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the frame rendered by the scenario at `index`
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("{:02}.png", index))
    }

    /// Frames that were actually written, in scenario order
    pub fn frames(&self, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|index| self.frame_path(index))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Tear down: remove the directory, or keep it and return its path
    pub fn finish(self) -> Result<Option<PathBuf>> {
        if self.keep {
            let path = self.dir.keep();
            tracing::info!("Keeping artifacts in {}", path.display());
            return Ok(Some(path));
        }
        self.dir.close()?;
        Ok(None)
    }
}

/// Concatenate `frames` horizontally and open the strip in a viewer
///
/// Both steps are delegated to external tools from the configuration; the
/// harness does not decode images.
pub async fn show_strip(frames: &[PathBuf], output: &Path, tools: &ViscatConfig) -> Result<()> {
    if frames.is_empty() {
        tracing::warn!("No rendered frames to display");
        return Ok(());
    }

    let (program, base_args) = tools
        .concat_command
        .split_first()
        .ok_or_else(|| Error::Config("viscat.concat_command is empty".to_string()))?;
    let program = which::which(program)
        .map_err(|e| Error::Config(format!("Concatenation tool '{}' not found: {}", program, e)))?;

    let status = Command::new(&program)
        .args(base_args)
        .args(frames)
        .arg(output)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| Error::spawn_failed(&program, e))?;
    if !status.success() {
        return Err(Error::Config(format!(
            "Concatenation tool exited with {:?}",
            status.code()
        )));
    }

    let viewer = which::which(&tools.viewer)
        .map_err(|e| Error::Config(format!("Viewer '{}' not found: {}", tools.viewer, e)))?;
    Command::new(&viewer)
        .arg(output)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| Error::spawn_failed(&viewer, e))?;
    Ok(())
}
