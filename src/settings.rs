//! Persistent settings for the timeline app.

use crate::timeline::transform::ScaleBounds;
use crate::timeline::types::HOUR_MS;
use crate::timeline::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const APP_DIR: &str = "prompt-timeline";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<config dir>/prompt-timeline/<file>`
pub fn config_file(file: &str) -> Result<PathBuf, SettingsError> {
    dirs::config_dir()
        .map(|mut p| {
            p.push(APP_DIR);
            p.push(file);
            p
        })
        .ok_or(SettingsError::NoConfigDir)
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// All persistable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Auto-rerank
    pub rerank_debounce_ms: u64,
    pub rerank_resumes_after_manual_sort: bool,

    // Zoom
    pub min_scale: f64,
    pub max_scale: f64,
    pub pan_margin_fraction: f64,
    pub domain_buffer_hours: f64,

    // Playback
    pub min_step_ms: u64,
    pub final_hold_ms: u64,
    pub theater_duration_ms: u64,
    pub replay_speedup: f64,

    // Lanes
    pub max_visible_projects: usize,
    pub project_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rerank_debounce_ms: 500,
            rerank_resumes_after_manual_sort: false,

            min_scale: 0.5,
            max_scale: 100.0,
            pan_margin_fraction: 0.1,
            domain_buffer_hours: 24.0,

            min_step_ms: 300,
            final_hold_ms: 2000,
            theater_duration_ms: 120_000,
            replay_speedup: 10.0,

            max_visible_projects: 999,
            project_filter: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, returning defaults if the file is missing or invalid
    pub fn load() -> Self {
        match config_file("settings.json") {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                tracing::warn!("{}, using default settings", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match read_json::<Settings>(path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {:?}", path);
                settings.sanitized()
            }
            Err(e) => {
                tracing::warn!("{}, using default settings", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&config_file("settings.json")?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        write_json(path, self)?;
        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Repair values a hand-edited file could break.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            self.min_scale = defaults.min_scale;
            self.max_scale = defaults.max_scale;
        }
        if self.replay_speedup <= 0.0 {
            self.replay_speedup = defaults.replay_speedup;
        }
        self.max_visible_projects = self.max_visible_projects.max(1);
        self.pan_margin_fraction = self.pan_margin_fraction.clamp(0.0, 1.0);
        self
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            rerank_debounce: Duration::from_millis(self.rerank_debounce_ms),
            scale_bounds: ScaleBounds {
                min: self.min_scale,
                max: self.max_scale,
            },
            min_step: Duration::from_millis(self.min_step_ms),
            final_hold: Duration::from_millis(self.final_hold_ms),
            theater_duration: Duration::from_millis(self.theater_duration_ms),
            replay_speedup: self.replay_speedup,
            domain_buffer_ms: self.domain_buffer_hours * HOUR_MS,
            pan_margin_fraction: self.pan_margin_fraction,
            max_visible_projects: self.max_visible_projects,
            rerank_resumes_after_manual_sort: self.rerank_resumes_after_manual_sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("prompt-timeline-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn defaults_match_engine_defaults() {
        assert_eq!(Settings::default().engine_config(), EngineConfig::default());
    }

    #[test]
    fn round_trips_through_disk() {
        let path = temp_path("settings-roundtrip.json");
        let settings = Settings {
            max_visible_projects: 12,
            project_filter: Some("/work/api".into()),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = temp_path("settings-partial.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"replay_speedup": 4.0, "min_scale": 9.0, "max_scale": 1.0}"#).unwrap();
        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.replay_speedup, 4.0);
        assert_eq!(loaded.min_scale, 0.5);
        assert_eq!(loaded.max_scale, 100.0);
        assert_eq!(loaded.rerank_debounce_ms, 500);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let path = temp_path("settings-garbage.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
        let _ = std::fs::remove_file(&path);
    }
}
