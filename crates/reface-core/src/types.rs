use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Staging slot for an uploaded image.
///
/// The role determines the fixed file name inside the workspace; a new
/// upload for the same role overwrites the previous one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The face to use.
    Source,
    /// The image whose face gets replaced.
    Target,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Source, Role::Target];

    /// File name for this role inside the workspace.
    pub fn file_name(&self) -> &'static str {
        match self {
            Role::Source => "source.jpg",
            Role::Target => "target.jpg",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => write!(f, "source"),
            Role::Target => write!(f, "target"),
        }
    }
}

#[derive(Error, Debug)]
#[error("unknown role: {0} (expected \"source\" or \"target\")")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Role::Source),
            "target" => Ok(Role::Target),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// One fully resolved invocation of the external tool.
///
/// Built fresh per run from absolute paths plus the configured tool
/// options; immutable once built and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub source: PathBuf,
    pub target: PathBuf,
    pub output_dir: PathBuf,
    /// Hardware backend selector passed to the tool (e.g. "cpu").
    pub execution_provider: String,
    /// Named processing stage the tool should run (e.g. "face_swapper").
    pub frame_processor: String,
}

impl SwapRequest {
    /// Argument list for the external tool, after the headless-mode flag.
    pub fn to_args(&self, headless_flag: &str) -> Vec<OsString> {
        vec![
            headless_flag.into(),
            "--source".into(),
            self.source.clone().into_os_string(),
            "--target".into(),
            self.target.clone().into_os_string(),
            "--output".into(),
            self.output_dir.clone().into_os_string(),
            "--execution-providers".into(),
            self.execution_provider.clone().into(),
            "--frame-processors".into(),
            self.frame_processor.clone().into(),
        ]
    }
}

/// Terminal state of one invocation, with the captured tool log.
///
/// `SucceededNoOutput` is deliberately distinct from both other states:
/// the tool exited cleanly but the output directory held no recognizable
/// image afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapOutcome {
    Succeeded { log: String, result: PathBuf },
    SucceededNoOutput { log: String },
    Failed { log: String },
}

impl SwapOutcome {
    /// Whether the tool itself reported success (exit code zero).
    pub fn success(&self) -> bool {
        !matches!(self, SwapOutcome::Failed { .. })
    }

    /// Captured tool output: stdout on success, stderr on failure.
    pub fn log(&self) -> &str {
        match self {
            SwapOutcome::Succeeded { log, .. }
            | SwapOutcome::SucceededNoOutput { log }
            | SwapOutcome::Failed { log } => log,
        }
    }

    /// The located result image, if any.
    pub fn result_path(&self) -> Option<&Path> {
        match self {
            SwapOutcome::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_parse_rejects_unknown() {
        assert!("both".parse::<Role>().is_err());
        assert!("Source".parse::<Role>().is_err());
    }

    #[test]
    fn test_request_args_order() {
        let request = SwapRequest {
            source: PathBuf::from("/w/source.jpg"),
            target: PathBuf::from("/w/target.jpg"),
            output_dir: PathBuf::from("/w/out"),
            execution_provider: "cpu".into(),
            frame_processor: "face_swapper".into(),
        };
        let args = request.to_args("--headless");
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            [
                "--headless",
                "--source",
                "/w/source.jpg",
                "--target",
                "/w/target.jpg",
                "--output",
                "/w/out",
                "--execution-providers",
                "cpu",
                "--frame-processors",
                "face_swapper",
            ]
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = SwapOutcome::Succeeded {
            log: "done".into(),
            result: PathBuf::from("/out/result.jpg"),
        };
        assert!(ok.success());
        assert_eq!(ok.log(), "done");
        assert_eq!(ok.result_path(), Some(Path::new("/out/result.jpg")));

        let empty = SwapOutcome::SucceededNoOutput { log: String::new() };
        assert!(empty.success());
        assert_eq!(empty.result_path(), None);

        let failed = SwapOutcome::Failed { log: "boom".into() };
        assert!(!failed.success());
        assert_eq!(failed.result_path(), None);
    }

    #[test]
    fn test_outcome_state_tag() {
        let json = serde_json::to_value(&SwapOutcome::SucceededNoOutput { log: "x".into() }).unwrap();
        assert_eq!(json["state"], "succeeded_no_output");
    }
}
