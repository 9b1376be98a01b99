//! Recognition session orchestration
//!
//! This module owns one recognition attempt end to end:
//! - `RecognitionSession` — the state machine from "start listening" to the
//!   single terminal event
//! - `TimeoutPolicy` — deterministic processing deadlines
//! - `SessionRegistry` — id assignment and the one-active-session busy flag
//! - `SessionOptions` / `SessionStats` — per-attempt knobs and accounting

mod config;
mod registry;
mod session;
mod stats;
mod timeout;

pub use config::SessionOptions;
pub use registry::{ActiveSlot, SessionRegistry};
pub use session::RecognitionSession;
pub use stats::{Phase, SessionStats};
pub use timeout::TimeoutPolicy;
