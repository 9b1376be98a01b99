use crate::adapter::{SessionEvent, SessionEventSink};
use crate::error::ErrorKind;
use crate::service::RecognitionService;
use crate::session::RecognitionSession;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecognitionService>,
    /// Known sessions (session id → entry), terminal ones included so
    /// their result stays queryable.
    pub sessions: Arc<RwLock<HashMap<u32, Arc<SessionEntry>>>>,
}

/// How many finished sessions stay queryable before the oldest are evicted.
const MAX_FINISHED_RETAINED: usize = 32;

impl AppState {
    pub fn new(service: Arc<RecognitionService>) -> Self {
        Self {
            service,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Record a session, evicting the oldest finished entries past the
    /// retention bound. A session that is still running is never evicted.
    pub async fn insert_session(&self, session_id: u32, entry: Arc<SessionEntry>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, entry);

        let mut finished: Vec<u32> = sessions
            .iter()
            .filter(|(_, entry)| entry.session.is_finished())
            .map(|(id, _)| *id)
            .collect();
        let excess = finished.len().saturating_sub(MAX_FINISHED_RETAINED);
        if excess > 0 {
            finished.sort_unstable();
            for id in finished.into_iter().take(excess) {
                sessions.remove(&id);
            }
        }
    }
}

pub struct SessionEntry {
    pub session: RecognitionSession,
    pub record: Arc<RecordSink>,
}

/// Externally visible session state for the multi-session API.
///
/// A delivered final result returns the session to `idle` with its text
/// queryable; only failures stay in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiState {
    Idle,
    Recording,
    Processing,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub state: ApiState,
    pub partial_text: Option<String>,
    pub final_text: Option<String>,
    pub error: Option<ErrorKind>,
    pub error_message: Option<String>,
}

/// Sink that folds the ordered event stream into a queryable record.
///
/// Updates are a short mutex write, so the session's sequencing task is
/// never blocked by HTTP consumers polling state.
pub struct RecordSink {
    record: StdMutex<SessionRecord>,
}

impl RecordSink {
    pub fn new() -> Self {
        Self {
            record: StdMutex::new(SessionRecord {
                state: ApiState::Idle,
                partial_text: None,
                final_text: None,
                error: None,
                error_message: None,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionRecord {
        self.record.lock().unwrap().clone()
    }

    /// A canceled session goes back to idle with nothing delivered. A
    /// session that already failed keeps its error queryable; cancel after
    /// the fact must not erase it.
    pub fn mark_canceled(&self) {
        let mut record = self.record.lock().unwrap();
        if record.state != ApiState::Error {
            record.state = ApiState::Idle;
        }
    }
}

impl Default for RecordSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSink for RecordSink {
    fn emit(&self, event: SessionEvent) {
        let mut record = self.record.lock().unwrap();
        match event {
            SessionEvent::Ready => record.state = ApiState::Recording,
            SessionEvent::BeginningOfSpeech => {}
            SessionEvent::Partial(text) => record.partial_text = Some(text),
            SessionEvent::EndOfSpeech => record.state = ApiState::Processing,
            SessionEvent::Final(text) => {
                record.final_text = Some(text);
                record.state = ApiState::Idle;
            }
            SessionEvent::Error(kind, message) => {
                record.error = Some(kind);
                record.error_message = Some(message);
                record.state = ApiState::Error;
            }
        }
    }
}
