use anyhow::{Context, Result};
use ax25map_core::SsidMode;
use ax25map_events::LayoutAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Monitor log read when no input is given on the command line.
    pub log_file_path: PathBuf,
    pub keep_ssid: bool,
    pub include_destinations: bool,
    pub layout_algorithm: LayoutAlgorithm,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub anchor_debounce_ms: u64,
    pub layout_seed: Option<u64>,
    /// Where `--save` without a directory writes layouts.
    pub layouts_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_path: PathBuf::from("/var/log/ax25-listen.log"),
            keep_ssid: false,
            include_destinations: true,
            layout_algorithm: LayoutAlgorithm::default(),
            canvas_width: 1200.0,
            canvas_height: 800.0,
            anchor_debounce_ms: 100,
            layout_seed: None,
            layouts_dir: PathBuf::from("saved_layouts"),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        tracing::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    /// Like [`load`](Self::load) but falls back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Settings file {:?} not found, using defaults", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("{e:#}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn ssid_mode(&self) -> SsidMode {
        SsidMode::from_keep_flag(self.keep_ssid)
    }

    pub fn anchor_debounce(&self) -> Duration {
        Duration::from_millis(self.anchor_debounce_ms)
    }
}
