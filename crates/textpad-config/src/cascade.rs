//! Hierarchical `.editorconfig` resolution.
//!
//! Sources are collected by walking up from the file's directory and stop
//! after the first one declaring `root = true`. Values from nearer sources
//! override farther ones; inside a single source, later matching sections
//! override earlier ones. Resolution never fails: unreadable sources are
//! skipped with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::editorconfig::EditorConfigFile;

/// File name looked up in each ancestor directory.
pub const EDITORCONFIG_FILE_NAME: &str = ".editorconfig";

/// The value that removes a key set by a farther source.
const UNSET: &str = "unset";

/// The config sources that apply to one file, nearest first.
#[derive(Debug, Clone)]
pub struct ConfigCascade {
    file_path: PathBuf,
    sources: Vec<EditorConfigFile>,
}

impl ConfigCascade {
    /// Collects the sources for `file_path` from the filesystem.
    ///
    /// A relative path is taken against the current directory first so the
    /// walk reaches every ancestor.
    pub fn resolve(file_path: &Path) -> Self {
        let file_path =
            std::path::absolute(file_path).unwrap_or_else(|_| file_path.to_path_buf());
        let mut sources = Vec::new();
        let mut dir = file_path.parent();
        while let Some(current) = dir {
            let candidate = current.join(EDITORCONFIG_FILE_NAME);
            if candidate.is_file() {
                match EditorConfigFile::load(&candidate) {
                    Ok(source) => {
                        let root = source.root;
                        tracing::debug!("found config source {}", candidate.display());
                        sources.push(source);
                        if root {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("skipping config source {}: {e:#}", candidate.display());
                    }
                }
            }
            dir = current.parent();
        }
        Self { file_path, sources }
    }

    /// Builds a cascade from already parsed sources, nearest first.
    ///
    /// Sources after the first root source are ignored.
    pub fn from_sources(file_path: &Path, sources: Vec<EditorConfigFile>) -> Self {
        let mut kept = Vec::with_capacity(sources.len());
        for source in sources {
            let root = source.root;
            kept.push(source);
            if root {
                break;
            }
        }
        Self {
            file_path: file_path.to_path_buf(),
            sources: kept,
        }
    }

    /// The file this cascade was resolved for.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Sources, nearest directory first.
    pub fn sources(&self) -> &[EditorConfigFile] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Merges every matching section into a flat key/value view.
    pub fn resolved(&self) -> ResolvedConfig {
        let mut values = BTreeMap::new();
        for source in self.sources.iter().rev() {
            for section in source.matching_sections(&self.file_path) {
                for (key, value) in &section.properties {
                    if value.eq_ignore_ascii_case(UNSET) {
                        values.remove(key);
                    } else {
                        values.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        tracing::debug!(
            "resolved {} config keys for {}",
            values.len(),
            self.file_path.display()
        );
        ResolvedConfig { values }
    }
}

/// Value of the `indent_size` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentSize {
    /// `indent_size = tab`: indent by one tab stop.
    Tab,
    Columns(usize),
}

/// Flattened per-file settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    values: BTreeMap<String, String>,
}

impl ResolvedConfig {
    /// Raw value of `key` (keys are lowercase).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `true`/`false` keys. Anything else reads as unset.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key)?.parse().ok()
    }

    /// `end_of_line`, lowercased.
    pub fn end_of_line(&self) -> Option<String> {
        self.get("end_of_line").map(str::to_ascii_lowercase)
    }

    /// `charset`, lowercased.
    pub fn charset(&self) -> Option<String> {
        self.get("charset").map(str::to_ascii_lowercase)
    }

    /// `indent_style`: `true` for tabs, `false` for spaces.
    pub fn indent_with_tabs(&self) -> Option<bool> {
        match self.get("indent_style")?.to_ascii_lowercase().as_str() {
            "tab" => Some(true),
            "space" => Some(false),
            _ => None,
        }
    }

    pub fn indent_size(&self) -> Option<IndentSize> {
        let raw = self.get("indent_size")?;
        if raw.eq_ignore_ascii_case("tab") {
            return Some(IndentSize::Tab);
        }
        raw.parse().ok().map(IndentSize::Columns)
    }

    /// `tab_width`, falling back to a numeric `indent_size`.
    pub fn tab_width(&self) -> Option<usize> {
        self.get_usize("tab_width").or(match self.indent_size() {
            Some(IndentSize::Columns(n)) => Some(n),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
