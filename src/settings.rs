use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::DEFAULT_EXPORT_SCALE;
use crate::model::ConnectorKind;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is neither valid TOML nor JSON")]
    Parse { path: PathBuf },
    #[error("failed to serialize settings: {0}")]
    Serialize(String),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where the diagram record is kept. Defaults to the user data directory.
    pub storage_dir: Option<String>,
    pub snap_to_grid: bool,
    pub show_grid: bool,
    pub connector_kind: ConnectorKind,
    pub export_scale: f32,
    pub export_dir: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            snap_to_grid: true,
            show_grid: true,
            connector_kind: ConnectorKind::Arrow,
            export_scale: DEFAULT_EXPORT_SCALE,
            export_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn storage_dir(&self) -> PathBuf {
        if let Some(dir) = self.storage_dir.as_deref().filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        if let Some(data) = std::env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(data).join("flowsketch");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("flowsketch");
        }
        PathBuf::from("flowsketch-data")
    }

    /// Scale used for export, falling back to the default for nonsense values.
    pub fn export_scale(&self) -> f32 {
        if self.export_scale.is_finite() && self.export_scale > 0.0 {
            self.export_scale
        } else {
            DEFAULT_EXPORT_SCALE
        }
    }
}

/// First existing settings file: `~/.config/flowsketch.toml`, `settings.toml`, `settings.json`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(".config").join("flowsketch.toml");
        if path.exists() {
            return Some(path);
        }
    }
    ["settings.toml", "settings.json"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

/// Parses by extension first, then tries the other format.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let s = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = if is_toml(path) {
        toml::from_str::<Settings>(&s)
            .ok()
            .or_else(|| serde_json::from_str::<Settings>(&s).ok())
    } else {
        serde_json::from_str::<Settings>(&s)
            .ok()
            .or_else(|| toml::from_str::<Settings>(&s).ok())
    };
    parsed.ok_or_else(|| SettingsError::Parse {
        path: path.to_path_buf(),
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let text = if is_toml(path) {
        toml::to_string_pretty(settings).map_err(|e| SettingsError::Serialize(e.to_string()))?
    } else {
        serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?
    };
    std::fs::write(path, text).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}
