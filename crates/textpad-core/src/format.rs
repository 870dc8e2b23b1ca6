//! Format detection: byte encoding, line-ending convention and indentation.
//!
//! Each parameter is detected only when the caller has not pinned it.
//! Values from `.editorconfig` are applied on top of (or before) detection
//! by [`FormatParams::apply_config`].

use anyhow::{Context, Result};
use textpad_config::{AppConfig, IndentSize, ResolvedConfig};

use crate::encoding::{
    decode_bytes, detect_encoding, detect_line_ending, to_internal, LineEnding, TextEncoding,
};
use crate::indent::{detect_indent, IndentStyle, MAX_INDENT_MODE};

/// Indentation used for `indent_style = space` without a usable `indent_size`.
const DEFAULT_SPACE_INDENT: usize = 4;

/// Fallback values used when detection finds nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDefaults {
    /// Encoding label tried before guessing; `None` lets the content decide.
    pub encoding_label: Option<String>,
    pub line_ending: LineEnding,
    pub indentation: usize,
    pub tab_width: usize,
}

impl Default for FormatDefaults {
    fn default() -> Self {
        Self {
            encoding_label: None,
            line_ending: LineEnding::default(),
            indentation: 0,
            tab_width: 8,
        }
    }
}

impl FormatDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            encoding_label: Some(config.default_encoding.clone()).filter(|s| !s.is_empty()),
            line_ending: LineEnding::from_config_name(&config.default_line_ending)
                .unwrap_or_default(),
            indentation: config.default_indentation.min(MAX_INDENT_MODE),
            tab_width: config.default_tab_width.clamp(1, 8),
        }
    }
}

/// Format parameters, each either known or still to be detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatParams {
    pub encoding: Option<TextEncoding>,
    pub line_ending: Option<LineEnding>,
    /// 0 = tabs, N = N spaces.
    pub indentation: Option<usize>,
    pub tab_width: Option<usize>,
}

impl FormatParams {
    /// Overwrites parameters named by the resolved `.editorconfig` values.
    /// Unknown or out-of-range values are ignored.
    pub fn apply_config(&mut self, config: &ResolvedConfig) {
        if let Some(le) = config
            .end_of_line()
            .and_then(|name| LineEnding::from_config_name(&name))
        {
            self.line_ending = Some(le);
        }
        if let Some(enc) = config.charset().and_then(|c| TextEncoding::from_label(&c)) {
            self.encoding = Some(enc);
        }
        match config.indent_with_tabs() {
            Some(true) => self.indentation = Some(0),
            Some(false) => {
                let size = match config.indent_size() {
                    Some(IndentSize::Columns(n)) if (1..=MAX_INDENT_MODE).contains(&n) => n,
                    _ => self.indentation.filter(|n| *n > 0).unwrap_or(DEFAULT_SPACE_INDENT),
                };
                self.indentation = Some(size);
            }
            None => {}
        }
        if let Some(width) = config.tab_width().filter(|w| (1..=8).contains(w)) {
            self.tab_width = Some(width);
        }
    }
}

/// The outcome of decoding a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFormat {
    pub encoding: TextEncoding,
    pub line_ending: LineEnding,
    pub indentation: usize,
    pub tab_width: usize,
    /// Decoded content with `\r\n` separators.
    pub text: String,
}

/// Detects format parameters and decodes raw file content.
#[derive(Debug, Clone, Default)]
pub struct FormatDetector {
    defaults: FormatDefaults,
}

impl FormatDetector {
    pub fn new(defaults: FormatDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &FormatDefaults {
        &self.defaults
    }

    /// Decodes `bytes`, detecting every parameter that `pinned` leaves open.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be decoded with the chosen encoding.
    pub fn detect(&self, bytes: &[u8], pinned: &FormatParams) -> Result<DetectedFormat> {
        let encoding = pinned.encoding.unwrap_or_else(|| {
            detect_encoding(bytes, self.defaults.encoding_label.as_deref())
        });
        let raw_text = decode_bytes(bytes, encoding)
            .with_context(|| format!("failed to decode content as {encoding}"))?;

        let line_ending = pinned
            .line_ending
            .or_else(|| detect_line_ending(&raw_text))
            .unwrap_or(self.defaults.line_ending);
        let text = to_internal(&raw_text, line_ending);

        let indentation = pinned.indentation.unwrap_or_else(|| {
            detect_indent(&text)
                .map(|style| style.mode())
                .unwrap_or(self.defaults.indentation)
        });
        let tab_width = pinned.tab_width.unwrap_or(if indentation > 0 {
            indentation
        } else {
            self.defaults.tab_width
        });

        tracing::debug!(
            %encoding,
            %line_ending,
            indent = %IndentStyle::from_mode(indentation).unwrap_or_default(),
            tab_width,
            "detected format"
        );
        Ok(DetectedFormat {
            encoding,
            line_ending,
            indentation,
            tab_width,
            text,
        })
    }
}
