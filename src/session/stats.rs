use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle phase of a recognition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Recording,
    Processing,
    Finalizing,
    Done,
    Error,
    Canceled,
}

impl Phase {
    /// Whether this phase ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Error | Phase::Canceled)
    }
}

/// Accounting snapshot for one recognition attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub phase: Phase,

    /// When the session started recording.
    pub started_at: DateTime<Utc>,

    /// Observed audio duration, captured when recording stopped.
    pub audio_ms: Option<u64>,

    /// Time from end-of-speech to the terminal event, excluding any wait
    /// for a local model to finish loading.
    pub processing_ms: Option<u64>,

    /// Whether the AI post-processing step ran.
    pub post_process_attempted: bool,

    /// Whether the delivered text came from the AI step.
    pub post_process_used_ai: bool,

    /// Which vendor actually answered (the backup when the primary lost).
    pub answered_by: Option<String>,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Idle,
            started_at,
            audio_ms: None,
            processing_ms: None,
            post_process_attempted: false,
            post_process_used_ai: false,
            answered_by: None,
        }
    }
}
