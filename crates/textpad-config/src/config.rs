//! Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "TEXTPAD_CONFIG";

const CONFIG_FILE_NAME: &str = "textpad.json";

/// When `.editorconfig` values are applied during load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EditorConfigOverride {
    /// The cascade is never consulted.
    Disabled,
    /// Content detection runs first, the cascade overrides its results.
    #[default]
    AfterDetection,
    /// The cascade pins parameters so detection only fills the gaps.
    BeforeDetection,
}

impl EditorConfigOverride {
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }
}

impl TryFrom<u8> for EditorConfigOverride {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::AfterDetection),
            2 => Ok(Self::BeforeDetection),
            other => Err(format!("invalid editorconfig_override {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<EditorConfigOverride> for u8 {
    fn from(value: EditorConfigOverride) -> Self {
        match value {
            EditorConfigOverride::Disabled => 0,
            EditorConfigOverride::AfterDetection => 1,
            EditorConfigOverride::BeforeDetection => 2,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Encoding label used when content is not valid UTF-8 (e.g. "windows-1252").
    /// Empty = guess from content.
    pub default_encoding: String,
    /// Line ending for new documents and undetectable content: crlf, lf, cr, rs or ls.
    pub default_line_ending: String,
    /// 0 = tabs, 1..=8 = that many spaces.
    pub default_indentation: usize,
    pub default_tab_width: usize,
    pub editorconfig_override: EditorConfigOverride,
    /// Number of find specs remembered per session.
    pub find_history_limit: usize,
    /// Maximum undo states kept per document.
    pub undo_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_encoding: String::new(),
            default_line_ending: if cfg!(windows) { "crlf" } else { "lf" }.to_string(),
            default_indentation: 0,
            default_tab_width: 8,
            editorconfig_override: EditorConfigOverride::AfterDetection,
            find_history_limit: 32,
            undo_limit: 50,
        }
    }
}

impl AppConfig {
    /// Returns the config file path.
    ///
    /// Resolution order:
    /// 1. `$TEXTPAD_CONFIG`
    /// 2. `<user config dir>/textpad/textpad.json`
    /// 3. `textpad.json` next to the executable
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        if let Some(dir) = dirs::config_dir() {
            return dir.join("textpad").join(CONFIG_FILE_NAME);
        }
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join(CONFIG_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{e:#}"),
            }
            // Don't overwrite a broken file.
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e:#}", path.display());
            }
            config
        }
    }

    /// Loads and sanitizes config from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let mut config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    /// Saves config to `path` as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config at {}", path.display()))
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        self.default_indentation = self.default_indentation.min(8);
        self.default_tab_width = self.default_tab_width.clamp(1, 8);
        self.find_history_limit = self.find_history_limit.clamp(1, 256);
        self.undo_limit = self.undo_limit.max(1);
        self.default_encoding = self.default_encoding.trim().to_string();

        let eol = self.default_line_ending.trim().to_ascii_lowercase();
        let valid_eols = ["crlf", "lf", "cr", "rs", "ls"];
        self.default_line_ending = if valid_eols.contains(&eol.as_str()) {
            eol
        } else {
            Self::default().default_line_ending
        };
    }
}
