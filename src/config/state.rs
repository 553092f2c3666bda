// Application state module
// Shared, read-only state handed to every request handler

use super::types::Config;
use crate::storage::Storage;

/// Application state
pub struct AppState {
    pub config: Config,
    pub storage: Storage,
}

impl AppState {
    pub const fn new(config: Config, storage: Storage) -> Self {
        Self { config, storage }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
