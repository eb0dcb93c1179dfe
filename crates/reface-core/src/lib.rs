//! reface-core — staging and invocation layer for an external face-swap tool.
//!
//! Persists uploaded source/target images into a workspace, drives the
//! external command-line tool as a subprocess, and locates the produced
//! image. All operations are synchronous and blocking; callers that need
//! to stay responsive run them on a dedicated thread.

pub mod invoker;
pub mod output;
pub mod stager;
pub mod types;

pub use invoker::{InvokeError, Invoker};
pub use output::find_latest_image;
pub use stager::{StageError, Stager};
pub use types::{Role, SwapOutcome, SwapRequest};
