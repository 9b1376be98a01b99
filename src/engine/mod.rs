//! Recognition engine capability
//!
//! Vendor clients (cloud streaming, cloud file-upload, on-device models) are
//! consumed through one trait. An engine delivers tagged events over a
//! channel rather than through re-entrant callbacks, so the session can
//! sequence everything from a single task.

mod factory;
mod mock;
mod parallel;

pub use factory::{EngineBuilder, EngineFactory, EngineSelection};
pub use mock::{MockEngine, ScriptedEvent};
pub use parallel::ParallelEngineCoordinator;

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

/// Event emitted by a recognition engine.
///
/// After a `Final` or `Error` the engine must emit nothing further; the
/// session additionally guards against engines that violate this.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// In-progress transcription, may be revised by later events.
    Partial(String),
    /// Terminal transcription for this lifecycle.
    Final(String),
    /// Terminal failure, free-form vendor message.
    Error(String),
    /// Engine-initiated end of recording (e.g. VAD auto-stop).
    Stopped,
    /// Advisory input level.
    Amplitude(f32),
}

impl EngineEvent {
    /// Whether this event ends the engine's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineEvent::Final(_) | EngineEvent::Error(_))
    }
}

/// Which flavor of backend an engine represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Cloud streaming API (partials while recording).
    Streaming,
    /// Cloud file-upload API (one shot after recording ends).
    FileUpload,
    /// On-device model; may need load time before it is ready.
    LocalModel,
    /// Primary/backup race (see `ParallelEngineCoordinator`).
    Parallel,
    /// Loopback engine for connectivity testing.
    Loopback,
}

/// Uniform capability interface over speech-to-text backends.
///
/// Engines guarantee at most one terminal event per lifecycle and must
/// tolerate `stop()`/`cancel()` being called repeatedly or after
/// termination.
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Start recognizing. Returns the channel on which events arrive.
    async fn start(&mut self) -> Result<mpsc::Receiver<EngineEvent>>;

    /// Stop recording and finish processing what was heard.
    async fn stop(&mut self) -> Result<()>;

    /// Abort entirely; no further events will be honored.
    async fn cancel(&mut self) -> Result<()>;

    /// Whether the engine is between `start()` and its terminal event.
    fn is_running(&self) -> bool;

    /// Engine name for logging and accounting.
    fn name(&self) -> &str;

    fn kind(&self) -> EngineKind {
        EngineKind::Streaming
    }

    /// Readiness signal. Borrowing `true` means the engine can process
    /// audio now. Local-model engines flip this once the model is loaded;
    /// everything else is born ready.
    fn readiness(&self) -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(true);
        rx
    }

    /// Shared cell naming which underlying vendor produced the final
    /// result, when that is not simply this engine. Captured once before
    /// recognition starts so readers never contend with in-flight
    /// `stop()`/`cancel()` calls; the parallel coordinator fills in its
    /// winner, everything else leaves it empty.
    fn winner(&self) -> Arc<Mutex<Option<String>>> {
        Arc::new(Mutex::new(None))
    }
}

impl std::fmt::Debug for dyn RecognitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionEngine")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
