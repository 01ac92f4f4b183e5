//! Process-wide settings instance

use crate::{SettingsError, SettingsService};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL: OnceCell<Arc<SettingsService>> = OnceCell::new();

/// Install the store returned by [`global`]. Only the first call succeeds.
pub fn install_global(settings: Arc<SettingsService>) -> Result<(), SettingsError> {
    GLOBAL
        .set(settings)
        .map_err(|_| SettingsError::AlreadyInstalled)?;
    tracing::debug!("installed global settings service");
    Ok(())
}

/// The installed process-wide store, if any.
pub fn global() -> Option<Arc<SettingsService>> {
    GLOBAL.get().cloned()
}
