use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use reface_core::{InvokeError, Invoker, Role, StageError, Stager, SwapOutcome};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("stage error: {0}")]
    Stage(#[from] StageError),
    #[error("invoke error: {0}")]
    Invoke(#[from] InvokeError),
    #[error("no {0} image staged")]
    NotStaged(Role),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// One completed invocation, as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub id: String,
    pub completed_at: String,
    #[serde(flatten)]
    pub outcome: SwapOutcome,
}

/// Snapshot of the engine's workspace for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub last_swap: Option<SwapRecord>,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Stage {
        role: Role,
        bytes: Vec<u8>,
        reply: oneshot::Sender<Result<PathBuf, EngineError>>,
    },
    Swap {
        reply: oneshot::Sender<Result<SwapRecord, EngineError>>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Persist an uploaded buffer under the given role.
    pub async fn stage(&self, role: Role, bytes: Vec<u8>) -> Result<PathBuf, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Stage {
                role,
                bytes,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Run one swap over the staged images. Both roles must be staged.
    ///
    /// Blocks the engine thread (not the caller's task) for the lifetime
    /// of the subprocess; requests queued behind it wait their turn.
    pub async fn swap(&self) -> Result<SwapRecord, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Swap { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Current staged inputs and the last completed swap.
    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Creates the workspace and output directories up front (fail-fast),
/// then enters a request loop. The single thread serializes every stage,
/// swap and status query against the one workspace, so no locking
/// discipline is needed around the filesystem.
pub fn spawn_engine(
    workspace_dir: PathBuf,
    output_dir: PathBuf,
    invoker: Invoker,
) -> std::io::Result<EngineHandle> {
    std::fs::create_dir_all(&workspace_dir)?;
    std::fs::create_dir_all(&output_dir)?;
    tracing::info!(
        workspace = %workspace_dir.display(),
        output = %output_dir.display(),
        tool = %invoker.program().display(),
        "engine directories ready"
    );

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("reface-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let mut engine = Engine {
                stager: Stager::new(workspace_dir),
                invoker,
                output_dir,
                last_swap: None,
            };
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Stage { role, bytes, reply } => {
                        let result = engine.stage(role, &bytes);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Swap { reply } => {
                        let result = engine.swap();
                        let _ = reply.send(result);
                    }
                    EngineRequest::Status { reply } => {
                        let _ = reply.send(engine.status());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

/// Engine state, owned by the engine thread.
struct Engine {
    stager: Stager,
    invoker: Invoker,
    output_dir: PathBuf,
    last_swap: Option<SwapRecord>,
}

impl Engine {
    fn stage(&mut self, role: Role, bytes: &[u8]) -> Result<PathBuf, EngineError> {
        Ok(self.stager.stage(role, bytes)?)
    }

    /// Require both staged inputs, then run exactly one tool invocation.
    /// All three outcome states are terminal; re-triggering is the
    /// caller's decision.
    fn swap(&mut self) -> Result<SwapRecord, EngineError> {
        let source = self
            .stager
            .staged(Role::Source)
            .ok_or(EngineError::NotStaged(Role::Source))?;
        let target = self
            .stager
            .staged(Role::Target)
            .ok_or(EngineError::NotStaged(Role::Target))?;

        let outcome = self.invoker.invoke(&source, &target, &self.output_dir)?;

        let record = SwapRecord {
            id: uuid::Uuid::new_v4().to_string(),
            completed_at: chrono::Utc::now().to_rfc3339(),
            outcome,
        };
        tracing::info!(
            id = %record.id,
            success = record.outcome.success(),
            "swap completed"
        );
        self.last_swap = Some(record.clone());
        Ok(record)
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            source: self.stager.staged(Role::Source),
            target: self.stager.staged(Role::Target),
            output_dir: self.output_dir.clone(),
            last_swap: self.last_swap.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn stub_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("stub-tool");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn spawn(dir: &Path, tool_body: &str) -> EngineHandle {
        let tool = stub_tool(dir, tool_body);
        spawn_engine(
            dir.join("workspace"),
            dir.join("output"),
            Invoker::new(tool),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_swap_requires_both_roles() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = spawn(tmp.path(), "exit 0");

        let err = engine.swap().await.unwrap_err();
        assert!(matches!(err, EngineError::NotStaged(Role::Source)));

        engine.stage(Role::Source, b"face".to_vec()).await.unwrap();
        let err = engine.swap().await.unwrap_err();
        assert!(matches!(err, EngineError::NotStaged(Role::Target)));
    }

    #[tokio::test]
    async fn test_swap_records_outcome_in_status() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = spawn(tmp.path(), "cp \"$5\" \"$7/result.jpg\"");

        engine.stage(Role::Source, b"face".to_vec()).await.unwrap();
        engine.stage(Role::Target, b"scene".to_vec()).await.unwrap();

        let record = engine.swap().await.unwrap();
        assert!(record.outcome.success());
        let result = record.outcome.result_path().expect("result located");
        assert_eq!(fs::read(result).unwrap(), b"scene");

        let status = engine.status().await.unwrap();
        assert_eq!(status.last_swap.map(|r| r.id), Some(record.id));
    }

    #[tokio::test]
    async fn test_status_reflects_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = spawn(tmp.path(), "exit 0");

        let status = engine.status().await.unwrap();
        assert_eq!(status.source, None);
        assert_eq!(status.target, None);

        let path = engine.stage(Role::Target, b"scene".to_vec()).await.unwrap();
        let status = engine.status().await.unwrap();
        assert_eq!(status.target, Some(path));
        assert_eq!(status.source, None);
    }

    #[tokio::test]
    async fn test_requests_queue_behind_running_swap() {
        let tmp = tempfile::tempdir().unwrap();
        // The stub announces itself via a marker file, then stays alive,
        // keeping the engine thread busy inside the invocation.
        let marker = tmp.path().join("swap-running");
        let engine = spawn(
            tmp.path(),
            &format!("touch '{}'\nsleep 1", marker.display()),
        );

        engine.stage(Role::Source, b"face".to_vec()).await.unwrap();
        engine.stage(Role::Target, b"scene".to_vec()).await.unwrap();

        let swap = tokio::spawn({
            let engine = engine.clone();
            async move { engine.swap().await }
        });

        // Wait until the subprocess is actually running before queueing.
        for _ in 0..500 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(marker.exists(), "stub tool never started");

        // A stage issued now must wait its turn behind the in-flight swap.
        let queued_at = Instant::now();
        engine.stage(Role::Source, b"face2".to_vec()).await.unwrap();
        assert!(
            queued_at.elapsed() >= Duration::from_millis(500),
            "stage completed while the swap subprocess was still running"
        );

        let record = swap.await.unwrap().unwrap();
        assert!(record.outcome.success());
    }

    #[tokio::test]
    async fn test_failed_swap_is_contained() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = spawn(tmp.path(), "printf 'boom' >&2\nexit 1");

        engine.stage(Role::Source, b"face".to_vec()).await.unwrap();
        engine.stage(Role::Target, b"scene".to_vec()).await.unwrap();

        let record = engine.swap().await.unwrap();
        assert!(!record.outcome.success());
        assert_eq!(record.outcome.log(), "boom");

        // The engine keeps serving after a failed invocation.
        let status = engine.status().await.unwrap();
        assert!(status.last_swap.is_some());
    }
}
