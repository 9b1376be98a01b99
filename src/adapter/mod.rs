//! Session event contract and callback adapters
//!
//! The session emits one ordered stream of `SessionEvent`s per attempt:
//! `Ready`, zero-or-more `Partial`, at most one `BeginningOfSpeech`, at most
//! one `EndOfSpeech`, then exactly one of `Final` or `Error`. Adapters
//! translate that stream to their external wire format and must never block
//! the orchestrator; a slow peer is decoupled behind a channel.

mod listener;

pub use listener::{ListenerAdapter, RecognitionListener};

use crate::error::ErrorKind;
use tokio::sync::mpsc;

/// One event in the ordered per-session stream delivered to adapters.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The engine started and the session is listening.
    Ready,
    /// Speech was detected for the first time in this attempt.
    BeginningOfSpeech,
    /// An in-progress, possibly-revised transcription.
    Partial(String),
    /// Recording ended; the session is processing.
    EndOfSpeech,
    /// The terminal transcription. No further text events follow.
    Final(String),
    /// The terminal failure. No further events follow.
    Error(ErrorKind, String),
}

/// Consumer of a session's ordered event stream.
///
/// `emit` is called from the session's single sequencing task and must not
/// block: adapters queue internally and drain on their own tasks.
pub trait SessionEventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);

    /// Advisory input-level update. Dropped once the session is terminal.
    fn amplitude(&self, _level: f32) {}
}

/// Sink that forwards events onto an unbounded channel.
///
/// Used by tests and by callers that want to consume the stream directly.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionEventSink for ChannelSink {
    fn emit(&self, event: SessionEvent) {
        // Receiver gone means nobody is listening anymore; drop the event.
        let _ = self.tx.send(event);
    }
}

/// Best-effort classification of a free-form engine error message.
///
/// Substring matching is heuristic by nature: mixed-cause messages land on
/// whichever category matches first. Kept at the adapter boundary so the
/// core only ever sees explicit `ErrorKind` values.
pub fn classify_message(message: &str) -> ErrorKind {
    let msg = message.to_lowercase();

    if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        ErrorKind::Timeout
    } else if msg.contains("permission")
        || msg.contains("denied")
        || msg.contains("unauthorized")
        || msg.contains("forbidden")
    {
        ErrorKind::PermissionDenied
    } else if msg.contains("network")
        || msg.contains("connect")
        || msg.contains("unreachable")
        || msg.contains("dns")
        || msg.contains("socket")
    {
        ErrorKind::Network
    } else if msg.contains("microphone") || msg.contains("audio") || msg.contains("device") {
        ErrorKind::Audio
    } else if msg.contains("no match") || msg.contains("no speech") || msg.contains("empty result")
    {
        ErrorKind::NoMatch
    } else if msg.contains("server")
        || msg.contains("internal error")
        || msg.contains("quota")
        || msg.contains("rate limit")
    {
        ErrorKind::Server
    } else {
        ErrorKind::Client
    }
}
