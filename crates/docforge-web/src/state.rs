use std::time::Duration;

use docforge_core::{AppConfig, DocumentConverter};
use tracing::{debug, info, warn};

/// Global application state
pub struct AppState {
    pub converter: DocumentConverter,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let converter = DocumentConverter::new(&config);
        Self::with_converter(config, converter)
    }

    /// Use a prepared converter, e.g. one with a custom office backend
    pub const fn with_converter(config: AppConfig, converter: DocumentConverter) -> Self {
        Self { converter, config }
    }

    /// Remove scratch entries older than `scratch.max_age_secs`.
    ///
    /// Returns the number of entries removed; failures are logged.
    pub async fn sweep_scratch(&self) -> usize {
        let max_age = Duration::from_secs(self.config.scratch.max_age_secs);
        match self.converter.scratch().sweep(max_age).await {
            Ok(0) => {
                debug!("Scratch sweep found nothing to remove");
                0
            }
            Ok(removed) => {
                info!("Swept {} orphaned scratch entries", removed);
                removed
            }
            Err(e) => {
                warn!("Scratch sweep failed: {}", e);
                0
            }
        }
    }
}
