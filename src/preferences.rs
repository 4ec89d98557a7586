use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::storage::{KeyValueStore, API_KEY, DARK_MODE};

fn write_api_key(store: &dyn KeyValueStore, api_key: Option<&str>) -> Result<()> {
    match api_key {
        Some(key) => store.set(API_KEY, key),
        None => store.delete(API_KEY),
    }
}

/// User settings kept next to the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub api_key: Option<String>,
    pub dark_mode: bool,
}

impl Preferences {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let api_key = store
            .get(API_KEY)?
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let dark_mode = match store.get(DARK_MODE)?.as_deref().map(str::trim) {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => {
                warn!(value = other, "Unrecognised dark mode flag, using light mode");
                false
            }
        };

        Ok(Self { api_key, dark_mode })
    }

    /// Writes both entries. If the second write fails the key is put back,
    /// so the store never holds half of an update.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let previous_key = store.get(API_KEY)?;
        write_api_key(store, self.api_key.as_deref())?;

        if let Err(err) = store.set(DARK_MODE, if self.dark_mode { "true" } else { "false" }) {
            if let Err(restore) = write_api_key(store, previous_key.as_deref()) {
                warn!(error = %restore, "Failed to restore the previous API key");
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::ValidationError("API key must not be empty".into()));
        }
        self.api_key = Some(api_key.to_string());
        info!("API key set");
        Ok(())
    }

    pub fn clear_api_key(&mut self) {
        self.api_key = None;
    }

    /// Flips the display mode and returns the new value.
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }
}
