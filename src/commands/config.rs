use crate::config::{FocusConfig, SnapCrabConfig};
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<SnapCrabConfig>> =
        Arc::new(RwLock::new(SnapCrabConfig::load_or_default()));
}

/// Configuration the next session will be created with
pub(crate) fn current_config() -> Result<SnapCrabConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

fn store(new_config: SnapCrabConfig) -> Result<(), String> {
    new_config.validate()?;

    {
        let mut config = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *config = new_config.clone();
    }

    new_config
        .save_to_file(SnapCrabConfig::default_path())
        .map_err(|e| e.to_string())
}

/// Get the current configuration
#[command]
pub async fn get_config() -> Result<SnapCrabConfig, String> {
    current_config()
}

/// Replace and persist the configuration. Applies to sessions initialized
/// afterwards.
#[command]
pub async fn update_config(new_config: SnapCrabConfig) -> Result<(), String> {
    store(new_config)?;
    log::info!("Configuration updated");
    Ok(())
}

/// Update only the focus section
#[command]
pub async fn update_focus_config(focus: FocusConfig) -> Result<(), String> {
    let mut config = current_config()?;
    config.focus = focus;
    store(config)
}

/// Reset configuration to defaults
#[command]
pub async fn reset_config() -> Result<SnapCrabConfig, String> {
    let default_config = SnapCrabConfig::default();
    store(default_config.clone())?;
    Ok(default_config)
}
