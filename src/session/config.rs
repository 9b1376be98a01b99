use super::timeout::TimeoutPolicy;
use crate::render::RendererConfig;
use std::time::Duration;

/// Per-attempt knobs for a recognition session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Processing-deadline policy.
    pub timeout: TimeoutPolicy,

    /// Cadence for the paced renderer used during post-processing.
    pub renderer: RendererConfig,

    /// Whether to run the AI post-processing pipeline when one is
    /// available. The deterministic simple cleanup always applies.
    pub post_processing: bool,

    /// Upper bound on waiting for a local model to finish loading before
    /// the processing deadline starts counting.
    pub ready_wait_max: Duration,

    /// Upper bound on waiting for the renderer to rush-converge before the
    /// final event goes out regardless.
    pub converge_wait_max: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: TimeoutPolicy::default(),
            renderer: RendererConfig::default(),
            post_processing: true,
            ready_wait_max: Duration::from_secs(60),
            converge_wait_max: Duration::from_secs(3),
        }
    }
}
