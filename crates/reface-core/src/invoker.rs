//! Swap invocation: drive the external face-swap tool as a subprocess.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::output::find_latest_image;
use crate::types::{SwapOutcome, SwapRequest};

/// Flag that puts the external tool into non-interactive mode.
pub const HEADLESS_FLAG: &str = "--headless";
/// Default hardware backend selector.
pub const DEFAULT_EXECUTION_PROVIDER: &str = "cpu";
/// Default processing stage to run.
pub const DEFAULT_FRAME_PROCESSOR: &str = "face_swapper";

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("input image not found: {0}")]
    InputMissing(PathBuf),
    #[error("failed to prepare output directory {0}: {1}")]
    OutputDir(PathBuf, io::Error),
    #[error("failed to run {0}: {1}")]
    Spawn(PathBuf, io::Error),
}

/// Runs the external tool with a fixed argument list and captured stdio.
///
/// The execution provider and frame processor are configuration constants
/// of the invoker, not request parameters. Exactly one subprocess attempt
/// per call: no timeout, no cancellation, no retries.
pub struct Invoker {
    program: PathBuf,
    headless_flag: String,
    execution_provider: String,
    frame_processor: String,
}

impl Invoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            headless_flag: HEADLESS_FLAG.to_string(),
            execution_provider: DEFAULT_EXECUTION_PROVIDER.to_string(),
            frame_processor: DEFAULT_FRAME_PROCESSOR.to_string(),
        }
    }

    pub fn with_execution_provider(mut self, provider: impl Into<String>) -> Self {
        self.execution_provider = provider.into();
        self
    }

    pub fn with_frame_processor(mut self, processor: impl Into<String>) -> Self {
        self.frame_processor = processor.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run one swap to completion, blocking until the subprocess exits.
    ///
    /// All three paths are resolved to absolute form first (the subprocess
    /// is sensitive to working directory); the output directory is created
    /// if absent. Exit code zero maps to `Succeeded` with the newest image
    /// in the output directory, or `SucceededNoOutput` when the scan finds
    /// none. A non-zero exit maps to `Failed` with the captured stderr.
    pub fn invoke(
        &self,
        source: &Path,
        target: &Path,
        output_dir: &Path,
    ) -> Result<SwapOutcome, InvokeError> {
        let request = self.resolve(source, target, output_dir)?;

        tracing::info!(
            program = %self.program.display(),
            source = %request.source.display(),
            target = %request.target.display(),
            output = %request.output_dir.display(),
            provider = %request.execution_provider,
            processor = %request.frame_processor,
            "invoking swap tool"
        );

        let output = Command::new(&self.program)
            .args(request.to_args(&self.headless_flag))
            .output()
            .map_err(|e| InvokeError::Spawn(self.program.clone(), e))?;

        if output.status.success() {
            let log = String::from_utf8_lossy(&output.stdout).into_owned();
            match find_latest_image(&request.output_dir) {
                Some(result) => {
                    tracing::info!(result = %result.display(), "swap succeeded");
                    Ok(SwapOutcome::Succeeded { log, result })
                }
                None => {
                    tracing::warn!(
                        output = %request.output_dir.display(),
                        "tool exited cleanly but wrote no recognizable image"
                    );
                    Ok(SwapOutcome::SucceededNoOutput { log })
                }
            }
        } else {
            let log = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::warn!(code = ?output.status.code(), "swap tool failed");
            Ok(SwapOutcome::Failed { log })
        }
    }

    /// Resolve all paths to absolute form and freeze them into a request.
    /// Missing inputs fail here, before any subprocess is spawned.
    fn resolve(
        &self,
        source: &Path,
        target: &Path,
        output_dir: &Path,
    ) -> Result<SwapRequest, InvokeError> {
        let source = source
            .canonicalize()
            .map_err(|_| InvokeError::InputMissing(source.to_path_buf()))?;
        let target = target
            .canonicalize()
            .map_err(|_| InvokeError::InputMissing(target.to_path_buf()))?;

        fs::create_dir_all(output_dir)
            .map_err(|e| InvokeError::OutputDir(output_dir.to_path_buf(), e))?;
        let output_dir = output_dir
            .canonicalize()
            .map_err(|e| InvokeError::OutputDir(output_dir.to_path_buf(), e))?;

        Ok(SwapRequest {
            source,
            target,
            output_dir,
            execution_provider: self.execution_provider.clone(),
            frame_processor: self.frame_processor.clone(),
        })
    }
}
