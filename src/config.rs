use crate::render::RendererConfig;
use crate::session::TimeoutPolicy;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recognition: RecognitionConfig,
    pub timeout: TimeoutConfig,
    pub renderer: RendererSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    /// Primary vendor id ("mock" for the loopback engine).
    pub vendor: String,
    /// Backup vendor raced against the primary when enabled.
    pub backup_vendor: Option<String>,
    pub backup_enabled: bool,
    /// Run the AI post-processing pipeline when one is attached.
    pub post_processing: bool,
}

#[derive(Debug, Deserialize)]
pub struct TimeoutConfig {
    pub floor_ms: u64,
    pub audio_scale: f64,
    pub parallel_slack_ms: u64,
}

impl TimeoutConfig {
    pub fn policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            floor: Duration::from_millis(self.floor_ms),
            audio_scale: self.audio_scale,
            parallel_slack: Duration::from_millis(self.parallel_slack_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RendererSettings {
    pub frame_delay_ms: u64,
    pub max_step: usize,
    pub rush_frame_delay_ms: u64,
    pub rush_max_step: usize,
}

impl RendererSettings {
    pub fn config(&self) -> RendererConfig {
        RendererConfig {
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            max_step: self.max_step,
            rush_frame_delay: Duration::from_millis(self.rush_frame_delay_ms),
            rush_max_step: self.rush_max_step,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
