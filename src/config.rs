use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::color::Color;

/// Grid core configuration, loaded from ~/.config/drizzle/config.json.
///
/// The grid only ever consumes this as an immutable snapshot; parsing and
/// hot-reload policy belong to the embedding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of scrollback lines kept above the screen. Screen + scrollback
    /// is rounded up to a power of two when the ring is sized.
    pub scrollback_lines: usize,
    /// Characters treated as word constituents (in addition to letters and
    /// digits) by word selection.
    pub word_chars: String,
    /// Foreground written by erase operations.
    pub default_fg: Color,
    /// Background written by erase operations.
    pub default_bg: Color,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrollback_lines: 10_000,
            word_chars: "_-./~?&=%+#".to_string(),
            default_fg: Color::Default,
            default_bg: Color::Default,
        }
    }
}

impl Config {
    /// Load config from the standard config path, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard config path.
    pub fn save(&self) -> crate::error::Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("drizzle")
        .join("config.json")
}
