use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};

/// What the launcher does once the game process has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherAction {
    Close,
    Keep,
    Hide,
}

/// Which Java binary launches the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JavaChoice {
    Named(JavaPreset),
    Path(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JavaPreset {
    Bundled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSettings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

/// User-facing game settings, persisted as `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub java: JavaChoice,
    pub memory: MemorySettings,
    pub resolution: ResolutionSettings,
    pub launcher_action: LauncherAction,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            java: JavaChoice::Named(JavaPreset::Bundled),
            memory: MemorySettings {
                min: "2048".into(),
                max: "4096".into(),
            },
            resolution: ResolutionSettings {
                width: 1280,
                height: 720,
                fullscreen: false,
            },
            launcher_action: LauncherAction::Close,
        }
    }
}

impl GameSettings {
    /// Load settings; a missing file is created with defaults, an unreadable one
    /// falls back to defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let defaults = Self::default();
            if let Err(e) = defaults.save(path) {
                warn!("Could not write default settings to {:?}: {}", path, e);
            }
            return defaults;
        }

        match std::fs::read_to_string(path)
            .map_err(|e| LauncherError::io(path, e))
            .and_then(|raw| serde_json::from_str(&raw).map_err(LauncherError::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Error reading settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| LauncherError::io(path, e))
    }

    /// Minimum and maximum heap in MB.
    pub fn memory_mb(&self) -> (u32, u32) {
        let defaults = Self::default();
        let min = parse_memory_mb(&self.memory.min)
            .or_else(|| parse_memory_mb(&defaults.memory.min))
            .unwrap_or(2048);
        let max = parse_memory_mb(&self.memory.max)
            .or_else(|| parse_memory_mb(&defaults.memory.max))
            .unwrap_or(4096);
        (min.min(max), max)
    }
}

/// Parse `"4096"`, `"4096M"` or `"4G"` into megabytes.
pub fn parse_memory_mb(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let (number, multiplier) = if let Some(n) = lower.strip_suffix('g') {
        (n, 1024.0)
    } else if let Some(n) = lower.strip_suffix('m') {
        (n, 1.0)
    } else {
        (lower.as_str(), 1.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u32)
}

/// Host facts shown next to the memory settings.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub total_mem_gb: u64,
    pub version: &'static str,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            total_mem_gb: (system.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0).round() as u64,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
