//! The configuration currently in effect for an element
//!
//! Loads happen under a lock and only a fully validated [`GlobalConfig`] is
//! published. Readers take an `Arc` snapshot and never see a partial model.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, warn};

use super::{load_config_with, ConfigError, GlobalConfig, LoadOptions};

#[derive(Debug, Default)]
pub struct ActiveConfig {
    current: Mutex<Option<Arc<GlobalConfig>>>,
}

impl ActiveConfig {
    fn lock(&self) -> MutexGuard<'_, Option<Arc<GlobalConfig>>> {
        // The slot is only ever overwritten whole, so a poisoned guard is still consistent.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the published configuration
    pub fn current(&self) -> Option<Arc<GlobalConfig>> {
        self.lock().clone()
    }

    /// Load `config_file` and publish it. On failure the previous
    /// configuration stays in effect.
    pub fn reload(
        &self,
        config_file: impl AsRef<Path>,
        base: impl AsRef<Path>,
    ) -> Result<Arc<GlobalConfig>, ConfigError> {
        self.reload_with(config_file, base, &LoadOptions::default())
    }

    pub fn reload_with(
        &self,
        config_file: impl AsRef<Path>,
        base: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Arc<GlobalConfig>, ConfigError> {
        let mut slot = self.lock();
        match load_config_with(config_file.as_ref(), base, options) {
            Ok(config) => {
                let config = Arc::new(config);
                info!(
                    "Publishing configuration from {} ({} groups)",
                    config.config_file.display(),
                    config.groups.len()
                );
                *slot = Some(Arc::clone(&config));
                Ok(config)
            }
            Err(e) => {
                if slot.is_some() {
                    warn!(
                        "Keeping previous configuration, {} failed to load",
                        config_file.as_ref().display()
                    );
                }
                Err(e)
            }
        }
    }
}
