use std::{
    fs, io,
    path::{Path, PathBuf},
};

use gem_core::{CoreError, MailMethod, Settings};
use thiserror::Error;
use tracing::{info, warn};

use crate::mailbox::{MailboxError, write_atomic_with_retry};

/// `settings.json` is expected to be tiny; refuse anything larger.
pub const MAX_SETTINGS_BYTES: u64 = 64 * 1024;

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("metadata read failed: {0}")]
    Metadata(#[source] io::Error),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("parse failed: {0}")]
    Parse(#[source] CoreError),
}

#[derive(Debug, Error)]
pub enum SettingsSaveError {
    #[error("serialize failed: {0}")]
    Serialize(#[source] CoreError),
    #[error(transparent)]
    Write(#[from] MailboxError),
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings, SettingsLoadError> {
    let meta = fs::metadata(path).map_err(SettingsLoadError::Metadata)?;
    if meta.len() > MAX_SETTINGS_BYTES {
        return Err(SettingsLoadError::TooLarge {
            size: meta.len(),
            max: MAX_SETTINGS_BYTES,
        });
    }

    let data = fs::read_to_string(path).map_err(SettingsLoadError::Read)?;
    Settings::from_json(&data).map_err(SettingsLoadError::Parse)
}

pub fn save_settings_to_path(path: &Path, settings: &Settings) -> Result<(), SettingsSaveError> {
    let payload = settings
        .to_json_pretty()
        .map_err(SettingsSaveError::Serialize)?;
    write_atomic_with_retry(path, payload.as_bytes())?;
    Ok(())
}

/// In-memory settings mirrored to disk after every mutation.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Loads from `path`, falling back to defaults on any failure.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match load_settings_from_path(&path) {
            Ok(settings) => settings,
            Err(SettingsLoadError::Metadata(err)) if err.kind() == io::ErrorKind::NotFound => {
                Settings::default()
            }
            Err(err) => {
                warn!(path = %path.display(), "settings ignored: {err}");
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn save(&self) -> Result<(), SettingsSaveError> {
        save_settings_to_path(&self.path, &self.settings)
    }

    pub fn set_mail(&mut self, method: MailMethod) -> Result<(), SettingsSaveError> {
        self.settings.preferred_mail = Some(method);
        info!(preferred_mail = %method, "preferred mail changed");
        self.save()
    }

    pub fn add_app(&mut self, name: &str) -> Result<bool, SettingsSaveError> {
        if !self.settings.add_app(name) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn add_window(&mut self, title: &str) -> Result<bool, SettingsSaveError> {
        if !self.settings.add_window(title) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn remove_app(&mut self, index: usize) -> Result<bool, SettingsSaveError> {
        if self.settings.remove_app(index).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn remove_window(&mut self, index: usize) -> Result<bool, SettingsSaveError> {
        if self.settings.remove_window(index).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}
