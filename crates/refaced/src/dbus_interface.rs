use zbus::interface;

use reface_core::Role;

use crate::engine::{EngineError, EngineHandle};

/// D-Bus interface for the Reface staging/swap daemon.
///
/// Bus name: dev.reface.Reface1
/// Object path: /dev/reface/Reface1
///
/// Structured payloads are returned as JSON strings so UI collaborators
/// can evolve without wire-format changes.
pub struct RefaceService {
    engine: EngineHandle,
}

impl RefaceService {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    async fn stage(&self, role: Role, bytes: Vec<u8>) -> zbus::fdo::Result<String> {
        tracing::info!(role = %role, len = bytes.len(), "stage requested");
        let path = self.engine.stage(role, bytes).await.map_err(to_fdo)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[interface(name = "dev.reface.Reface1")]
impl RefaceService {
    /// Stage the source face image. Returns the staged absolute path.
    async fn stage_source(&self, bytes: Vec<u8>) -> zbus::fdo::Result<String> {
        self.stage(Role::Source, bytes).await
    }

    /// Stage the target image. Returns the staged absolute path.
    async fn stage_target(&self, bytes: Vec<u8>) -> zbus::fdo::Result<String> {
        self.stage(Role::Target, bytes).await
    }

    /// Run one swap over the staged images. Returns the swap record as
    /// JSON; a failed or output-less tool run is still a record, only a
    /// missing precondition (unstaged role, absent tool) is a D-Bus error.
    async fn swap(&self) -> zbus::fdo::Result<String> {
        tracing::info!("swap requested");
        let record = self.engine.swap().await.map_err(to_fdo)?;
        serde_json::to_string(&record).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Staged inputs, output directory and last swap record, as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.engine.status().await.map_err(to_fdo)?;
        serde_json::to_string(&status).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }
}

fn to_fdo(err: EngineError) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(err.to_string())
}
