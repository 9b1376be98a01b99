use crate::adapter::SessionEventSink;
use crate::config::Config;
use crate::engine::{EngineBuilder, EngineFactory, EngineSelection};
use crate::error::StartError;
use crate::postprocess::PostProcessPipeline;
use crate::session::{RecognitionSession, SessionOptions, SessionRegistry};
use std::sync::Arc;
use tracing::info;

/// Service boundary shared by both external surfaces.
///
/// Holds the engine factory, the active-session registry, the optional AI
/// pipeline, and the default engine selection. Both the listener adapter
/// and the HTTP adapter start sessions through here, so busy-checking and
/// engine construction live in exactly one place.
pub struct RecognitionService {
    factory: EngineFactory,
    registry: SessionRegistry,
    pipeline: Option<Arc<dyn PostProcessPipeline>>,
    options: SessionOptions,
    default_selection: EngineSelection,
}

impl RecognitionService {
    pub fn new(
        factory: EngineFactory,
        options: SessionOptions,
        default_selection: EngineSelection,
    ) -> Self {
        Self {
            factory,
            registry: SessionRegistry::new(),
            pipeline: None,
            options,
            default_selection,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let selection = EngineSelection {
            vendor: cfg.recognition.vendor.clone(),
            backup_vendor: cfg.recognition.backup_vendor.clone(),
            backup_enabled: cfg.recognition.backup_enabled,
        };
        let mut options = SessionOptions::default();
        options.timeout = cfg.timeout.policy();
        options.renderer = cfg.renderer.config();
        options.post_processing = cfg.recognition.post_processing;
        Self::new(EngineFactory::new(), options, selection)
    }

    /// Attach the AI post-processing pipeline.
    pub fn with_pipeline(mut self, pipeline: Arc<dyn PostProcessPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Register a vendor engine builder.
    pub fn register_engine(&mut self, vendor: impl Into<String>, builder: EngineBuilder) {
        self.factory.register(vendor, builder);
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a recognition session delivering events to `sink`.
    ///
    /// Rejected with `Busy` while another session is active. `vendor`
    /// overrides the configured primary; `"mock"` runs the loopback
    /// engine.
    pub async fn start_session(
        &self,
        vendor: Option<&str>,
        sink: Arc<dyn SessionEventSink>,
    ) -> Result<RecognitionSession, StartError> {
        let (id, slot) = self.registry.begin()?;

        let mut selection = self.default_selection.clone();
        if let Some(vendor) = vendor {
            selection.vendor = vendor.to_string();
        }
        info!("session {}: building engine for vendor {}", id, selection.vendor);

        let engine = self
            .factory
            .create(&selection)
            .map_err(StartError::EngineBuild)?;

        RecognitionSession::start(id, engine, self.pipeline.clone(), sink, self.options, slot)
            .await
    }
}
