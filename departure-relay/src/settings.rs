//! User settings: search radius, backend URL and quick-start mode.
//!
//! Settings are edited in an external configuration page and persisted by
//! the host. The relay reads them at startup and again after every
//! configuration change.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Backend used until the user configures another one.
pub const DEFAULT_BACKEND_URL: &str = "https://api.tramlines.de";

/// Search radius used until the user configures another one.
pub const DEFAULT_RADIUS_METERS: u32 = 5000;

/// Errors reading or writing persisted settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Search radius around the current position, in metres.
    pub radius_meters: u32,
    /// Base URL of the departures backend, without trailing slash.
    pub backend_base_url: String,
    /// Skip the station list and show departures at the nearest station.
    pub quick_start: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
            backend_base_url: DEFAULT_BACKEND_URL.to_string(),
            quick_start: false,
        }
    }
}

/// Values submitted by the configuration page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Radius as entered by the user, in kilometres.
    pub radius_km: f64,
    pub api_url: String,
    pub quick_start: bool,
}

impl Settings {
    /// Apply a configuration page submission.
    ///
    /// The radius is converted to whole metres. A radius that is negative
    /// or not a number, or an empty URL, leaves that setting unchanged.
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if update.radius_km.is_finite() && update.radius_km >= 0.0 {
            self.radius_meters = (update.radius_km * 1000.0).round().min(u32::MAX as f64) as u32;
        } else {
            warn!(radius_km = update.radius_km, "ignoring invalid radius");
        }

        let url = update.api_url.trim().trim_end_matches('/');
        if url.is_empty() {
            warn!("ignoring empty backend URL");
        } else {
            self.backend_base_url = url.to_string();
        }

        self.quick_start = update.quick_start;
    }
}

/// Persistent home for [`Settings`].
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file.
///
/// A missing file means defaults; fields missing from the file fall back to
/// their defaults individually.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let text = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

/// In-process settings, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = settings.clone();
        Ok(())
    }
}
