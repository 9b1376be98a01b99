//! Multi-session HTTP protocol adapter
//!
//! External surface with small monotonically assigned integer session ids:
//! - POST /sessions/start - Start a recognition session (409 when busy)
//! - POST /sessions/:id/stop - End recording, start processing
//! - POST /sessions/:id/cancel - Abort a session
//! - GET /sessions/:id - State, text so far, accounting
//! - GET /health - Health check
//!
//! The "mock" vendor id runs the loopback engine through the full session
//! event contract for connectivity testing.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{ApiState, AppState, RecordSink, SessionEntry, SessionRecord};
