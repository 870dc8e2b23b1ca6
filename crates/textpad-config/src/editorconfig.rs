//! Parsing of a single `.editorconfig` file.
//!
//! The format is INI-like: an optional preamble (where `root` lives),
//! followed by `[glob]` section headers, each holding `key = value` lines.
//! Lines starting with `#` or `;` are comments. Keys are case-insensitive
//! and stored lowercased. Lines that fit none of these shapes are skipped.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::glob::GlobPattern;

/// Key/value pairs of one section.
pub type Properties = BTreeMap<String, String>;

/// One `[glob]` section.
#[derive(Debug, Clone)]
pub struct Section {
    pub pattern: GlobPattern,
    pub properties: Properties,
}

impl Section {
    /// The glob as written in the header.
    pub fn glob(&self) -> &str {
        self.pattern.as_str()
    }
}

/// A parsed config source.
#[derive(Debug, Clone)]
pub struct EditorConfigFile {
    /// Directory the file lives in; section globs are relative to it.
    pub dir: PathBuf,
    /// Whether this file stops the upward directory walk.
    pub root: bool,
    /// Keys found before the first section header.
    pub preamble: Properties,
    /// Sections in file order.
    pub sections: Vec<Section>,
}

impl EditorConfigFile {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        Ok(Self::parse(&text, dir))
    }

    /// Parses config text declared in `dir`. Never fails.
    pub fn parse(text: &str, dir: impl Into<PathBuf>) -> Self {
        let mut file = Self {
            dir: dir.into(),
            root: false,
            preamble: Properties::new(),
            sections: Vec::new(),
        };

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim().trim_start_matches('\u{FEFF}');
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let glob = &line[1..line.len() - 1];
                file.sections.push(Section {
                    pattern: GlobPattern::new(glob),
                    properties: Properties::new(),
                });
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::debug!(
                    "skipping malformed line {} in {}: {raw:?}",
                    line_no + 1,
                    file.dir.display()
                );
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            match file.sections.last_mut() {
                Some(section) => {
                    section.properties.insert(key, value);
                }
                None => {
                    file.preamble.insert(key, value);
                }
            }
        }

        file.root = file
            .preamble
            .get("root")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        file
    }

    /// Sections whose glob matches `file_path`, in file order.
    pub fn matching_sections<'a>(
        &'a self,
        file_path: &'a Path,
    ) -> impl Iterator<Item = &'a Section> + 'a {
        let relative = relative_path(&self.dir, file_path);
        self.sections
            .iter()
            .filter(move |s| s.pattern.matches(&relative))
    }
}

/// Renders `file` relative to `dir` with `/` separators.
///
/// Falls back to the full path when `file` is not below `dir`.
pub fn relative_path(dir: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(dir).unwrap_or(file);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
