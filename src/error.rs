use serde::Serialize;
use thiserror::Error;

/// Coarse error taxonomy for terminal session errors.
///
/// This is the closed set of categories the session reports downstream.
/// Free-form engine error messages are mapped into it at the adapter
/// boundary (see `adapter::classify_message`); the core never carries
/// uncategorized errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("insufficient permission")]
    PermissionDenied,

    #[error("a session is already active")]
    Busy,

    #[error("failed to build recognition engine")]
    EngineBuild,

    #[error("network error")]
    Network,

    #[error("recognition timed out")]
    Timeout,

    #[error("audio capture error")]
    Audio,

    #[error("no speech recognized")]
    NoMatch,

    #[error("recognition service error")]
    Server,

    #[error("client error")]
    Client,
}

/// Why a session could not be started.
#[derive(Debug, Error)]
pub enum StartError {
    /// Another session is already recording on this surface. The request
    /// is rejected immediately, never queued.
    #[error("a session is already active")]
    Busy,

    /// The engine factory could not produce a usable engine (unknown
    /// vendor, missing credentials for the primary, ...).
    #[error("failed to build recognition engine: {0}")]
    EngineBuild(#[source] anyhow::Error),

    /// The engine was built but refused to start.
    #[error("failed to start recognition engine: {0}")]
    EngineStart(#[source] anyhow::Error),
}

impl StartError {
    /// The taxonomy category this start failure maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StartError::Busy => ErrorKind::Busy,
            StartError::EngineBuild(_) => ErrorKind::EngineBuild,
            StartError::EngineStart(_) => ErrorKind::EngineBuild,
        }
    }
}
