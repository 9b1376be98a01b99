use super::{MockEngine, ParallelEngineCoordinator, RecognitionEngine};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds one engine instance for a vendor.
///
/// Builders fail when the vendor cannot be used right now (missing
/// credentials, missing model file, ...).
pub type EngineBuilder = Arc<dyn Fn() -> Result<Box<dyn RecognitionEngine>> + Send + Sync>;

/// Which engines to build for one recognition attempt.
#[derive(Debug, Clone)]
pub struct EngineSelection {
    /// Primary vendor id.
    pub vendor: String,
    /// Backup vendor id, raced against the primary when enabled.
    pub backup_vendor: Option<String>,
    /// Caller-level flag gating backup activation.
    pub backup_enabled: bool,
}

impl EngineSelection {
    pub fn primary_only(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            backup_vendor: None,
            backup_enabled: false,
        }
    }
}

/// Registry of vendor engine builders.
///
/// The "mock" vendor is always present and builds the loopback engine.
/// Real vendor clients register themselves at service construction.
pub struct EngineFactory {
    builders: HashMap<String, EngineBuilder>,
}

impl EngineFactory {
    pub fn new() -> Self {
        let mut factory = Self {
            builders: HashMap::new(),
        };
        factory.register(
            "mock",
            Arc::new(|| Ok(Box::new(MockEngine::loopback()) as Box<dyn RecognitionEngine>)),
        );
        factory
    }

    pub fn register(&mut self, vendor: impl Into<String>, builder: EngineBuilder) {
        self.builders.insert(vendor.into(), builder);
    }

    pub fn known_vendor(&self, vendor: &str) -> bool {
        self.builders.contains_key(vendor)
    }

    /// Build the engine for a selection.
    ///
    /// A primary that cannot be built is an error. A backup that is
    /// disabled, unknown, or fails to build (no credentials) degrades the
    /// selection to primary-only transparently.
    pub fn create(&self, selection: &EngineSelection) -> Result<Box<dyn RecognitionEngine>> {
        let Some(builder) = self.builders.get(&selection.vendor) else {
            bail!("unknown recognition vendor: {}", selection.vendor);
        };
        let primary = builder()?;

        if !selection.backup_enabled {
            return Ok(primary);
        }

        let Some(backup_vendor) = selection.backup_vendor.as_deref() else {
            return Ok(primary);
        };

        let Some(backup_builder) = self.builders.get(backup_vendor) else {
            warn!(
                "backup vendor {} is not registered, running primary only",
                backup_vendor
            );
            return Ok(primary);
        };

        match backup_builder() {
            Ok(backup) => {
                info!(
                    "racing primary {} against backup {}",
                    selection.vendor, backup_vendor
                );
                Ok(Box::new(ParallelEngineCoordinator::new(primary, backup)))
            }
            Err(e) => {
                warn!(
                    "backup vendor {} unavailable ({}), running primary only",
                    backup_vendor, e
                );
                Ok(primary)
            }
        }
    }
}

impl Default for EngineFactory {
    fn default() -> Self {
        Self::new()
    }
}
