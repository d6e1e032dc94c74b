use crate::error::AppError;
use crate::models::AppSettings;
use std::path::Path;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "./data/restoration-ops.toml";

/// Loads settings from `path`; a missing file yields the defaults
pub fn load_settings(path: &Path) -> Result<AppSettings, AppError> {
    if !path.exists() {
        log::info!(
            "No settings file at {}, using defaults",
            path.display()
        );
        return Ok(AppSettings::default());
    }

    let text = std::fs::read_to_string(path)?;
    AppSettings::from_toml(&text)
        .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
}

/// Writes settings to `path`, creating the parent directory
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let text = settings
        .to_toml()
        .map_err(|e| AppError::Config(format!("Serialize failed: {}", e)))?;
    std::fs::write(path, text)?;
    log::info!("Wrote settings to {}", path.display());
    Ok(())
}
