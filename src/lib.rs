pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod postprocess;
pub mod render;
pub mod service;
pub mod session;

pub use adapter::{
    classify_message, ChannelSink, ListenerAdapter, RecognitionListener, SessionEvent,
    SessionEventSink,
};
pub use config::Config;
pub use engine::{
    EngineEvent, EngineFactory, EngineKind, EngineSelection, MockEngine,
    ParallelEngineCoordinator, RecognitionEngine, ScriptedEvent,
};
pub use error::{ErrorKind, StartError};
pub use http::{create_router, AppState};
pub use postprocess::{apply_simple, PostProcessOutcome, PostProcessPipeline};
pub use render::{PacedTextRenderer, RendererConfig};
pub use service::RecognitionService;
pub use session::{
    Phase, RecognitionSession, SessionOptions, SessionRegistry, SessionStats, TimeoutPolicy,
};
