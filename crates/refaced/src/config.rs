use std::path::PathBuf;

use reface_core::invoker::{DEFAULT_EXECUTION_PROVIDER, DEFAULT_FRAME_PROCESSOR};

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Directory where uploaded images are staged.
    pub workspace_dir: PathBuf,
    /// Directory the external tool writes results into.
    pub output_dir: PathBuf,
    /// External swap tool to invoke.
    pub tool_program: PathBuf,
    /// Hardware backend selector passed to the tool.
    pub execution_provider: String,
    /// Named processing stage the tool should run.
    pub frame_processor: String,
}

impl Config {
    /// Load configuration from `REFACE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("reface");

        Self {
            workspace_dir: env_path("REFACE_WORKSPACE_DIR", || data_dir.join("workspace")),
            output_dir: env_path("REFACE_OUTPUT_DIR", || data_dir.join("output")),
            tool_program: env_path("REFACE_TOOL", || PathBuf::from("facefusion")),
            execution_provider: env_string(
                "REFACE_EXECUTION_PROVIDER",
                DEFAULT_EXECUTION_PROVIDER,
            ),
            frame_processor: env_string("REFACE_FRAME_PROCESSOR", DEFAULT_FRAME_PROCESSOR),
        }
    }
}

fn env_path(key: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| default())
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
