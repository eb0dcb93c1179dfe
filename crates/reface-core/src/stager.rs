//! Image staging: persist uploaded byte buffers into the workspace.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Role;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to prepare workspace {0}: {1}")]
    Workspace(PathBuf, io::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, io::Error),
}

/// Writes uploaded images to fixed per-role paths inside one workspace.
///
/// The workspace is explicit constructor configuration so independent
/// stagers (e.g. per session) never share paths. Overwrite semantics are
/// last-write-wins per role, no versioning, no locking.
pub struct Stager {
    workspace: PathBuf,
}

impl Stager {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// Write `bytes` verbatim to `<workspace>/<role>.jpg`, creating the
    /// workspace directory if absent. Returns the absolute path written.
    ///
    /// The buffer is not inspected; extension filtering is the upload
    /// widget's job.
    pub fn stage(&self, role: Role, bytes: &[u8]) -> Result<PathBuf, StageError> {
        let dir = self.ensure_workspace()?;
        let path = dir.join(role.file_name());
        fs::write(&path, bytes).map_err(|e| StageError::Write(path.clone(), e))?;
        tracing::debug!(role = %role, path = %path.display(), len = bytes.len(), "staged upload");
        Ok(path)
    }

    /// Absolute path of the staged image for `role`, if one exists on disk.
    pub fn staged(&self, role: Role) -> Option<PathBuf> {
        let path = self.workspace.join(role.file_name()).canonicalize().ok()?;
        path.is_file().then_some(path)
    }

    pub fn workspace(&self) -> &std::path::Path {
        &self.workspace
    }

    /// Create the workspace if needed and return its absolute path.
    fn ensure_workspace(&self) -> Result<PathBuf, StageError> {
        fs::create_dir_all(&self.workspace)
            .map_err(|e| StageError::Workspace(self.workspace.clone(), e))?;
        self.workspace
            .canonicalize()
            .map_err(|e| StageError::Workspace(self.workspace.clone(), e))
    }
}
