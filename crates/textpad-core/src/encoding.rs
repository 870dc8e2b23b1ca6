/// Encoding and line-ending detection and conversion for file I/O.
///
/// Document text is held with `\r\n` separators regardless of the file's
/// convention; conversion happens only when bytes are read or written.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Separator used for document text in memory.
pub const INTERNAL_EOL: &str = "\r\n";

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Supported text encodings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Ascii,
    /// A named encoding from `encoding_rs` (e.g., "windows-1252").
    Legacy(&'static str),
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8 => write!(f, "UTF-8"),
            Self::Utf8Bom => write!(f, "UTF-8 BOM"),
            Self::Utf16Le => write!(f, "UTF-16 LE"),
            Self::Utf16Be => write!(f, "UTF-16 BE"),
            Self::Ascii => write!(f, "ASCII"),
            Self::Legacy(name) => write!(f, "{name}"),
        }
    }
}

impl TextEncoding {
    /// Resolves an encoding label, accepting the `.editorconfig` charset
    /// names (`utf-8-bom`, `utf-16le`, `latin1`, ...) and any WHATWG label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        match label.as_str() {
            "" => None,
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-8-bom" | "utf8-bom" => Some(Self::Utf8Bom),
            "utf-16le" | "utf-16" => Some(Self::Utf16Le),
            "utf-16be" => Some(Self::Utf16Be),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            other => {
                let encoding = encoding_rs::Encoding::for_label(other.as_bytes())?;
                if encoding == encoding_rs::UTF_8 {
                    Some(Self::Utf8)
                } else if encoding == encoding_rs::UTF_16LE {
                    Some(Self::Utf16Le)
                } else if encoding == encoding_rs::UTF_16BE {
                    Some(Self::Utf16Be)
                } else {
                    Some(Self::Legacy(encoding.name()))
                }
            }
        }
    }

    /// The name used for this encoding in `.editorconfig` files.
    pub fn config_name(&self) -> String {
        match self {
            Self::Utf8 => "utf-8".to_string(),
            Self::Utf8Bom => "utf-8-bom".to_string(),
            Self::Utf16Le => "utf-16le".to_string(),
            Self::Utf16Be => "utf-16be".to_string(),
            Self::Ascii => "ascii".to_string(),
            Self::Legacy(name) => name.to_ascii_lowercase(),
        }
    }
}

/// Line ending convention. The numeric ids are stable and used by
/// [`LineEnding::from_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    /// `\r\n` (Windows)
    CrLf,
    /// `\n` (Unix/macOS)
    Lf,
    /// `\r` (Classic Mac)
    Cr,
    /// `\x1E` record separator
    Rs,
    /// `\u{2028}` line separator
    Ls,
}

impl Default for LineEnding {
    fn default() -> Self {
        if cfg!(windows) {
            Self::CrLf
        } else {
            Self::Lf
        }
    }
}

impl std::fmt::Display for LineEnding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CrLf => write!(f, "CRLF"),
            Self::Lf => write!(f, "LF"),
            Self::Cr => write!(f, "CR"),
            Self::Rs => write!(f, "RS"),
            Self::Ls => write!(f, "LS"),
        }
    }
}

impl LineEnding {
    pub const ALL: [LineEnding; 5] = [Self::CrLf, Self::Lf, Self::Cr, Self::Rs, Self::Ls];

    /// Returns the string representation of this line ending.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrLf => "\r\n",
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::Rs => "\u{1E}",
            Self::Ls => "\u{2028}",
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::CrLf => 0,
            Self::Lf => 1,
            Self::Cr => 2,
            Self::Rs => 3,
            Self::Ls => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// The `end_of_line` value for this convention.
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::CrLf => "crlf",
            Self::Lf => "lf",
            Self::Cr => "cr",
            Self::Rs => "rs",
            Self::Ls => "ls",
        }
    }

    /// Parses an `end_of_line` value (case-insensitive).
    pub fn from_config_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|le| le.config_name().eq_ignore_ascii_case(name))
    }
}

/// Detects the encoding of raw bytes.
///
/// Order: byte-order mark, UTF-8 validity (pure ASCII reported as
/// [`TextEncoding::Ascii`]), then `default_label` when it names a known
/// encoding, and finally a statistical guess.
pub fn detect_encoding(bytes: &[u8], default_label: Option<&str>) -> TextEncoding {
    if bytes.starts_with(&UTF8_BOM) {
        return TextEncoding::Utf8Bom;
    }
    if bytes.starts_with(&UTF16_LE_BOM) {
        return TextEncoding::Utf16Le;
    }
    if bytes.starts_with(&UTF16_BE_BOM) {
        return TextEncoding::Utf16Be;
    }

    if std::str::from_utf8(bytes).is_ok() {
        if bytes.is_ascii() {
            return TextEncoding::Ascii;
        }
        return TextEncoding::Utf8;
    }

    if let Some(encoding) = default_label.and_then(TextEncoding::from_label) {
        tracing::debug!("content is not UTF-8, using configured default {encoding}");
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    tracing::debug!("guessed encoding {}", encoding.name());
    TextEncoding::Legacy(encoding.name())
}

/// Detects the line ending style from the first separator in `text`.
///
/// Returns `None` when the text has no line separator.
pub fn detect_line_ending(text: &str) -> Option<LineEnding> {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' if chars.peek() == Some(&'\n') => return Some(LineEnding::CrLf),
            '\r' => return Some(LineEnding::Cr),
            '\n' => return Some(LineEnding::Lf),
            '\u{1E}' => return Some(LineEnding::Rs),
            '\u{2028}' | '\u{2029}' => return Some(LineEnding::Ls),
            _ => {}
        }
    }
    None
}

/// Decodes raw bytes into a String using the specified encoding.
///
/// # Errors
///
/// Returns an error if decoding fails.
pub fn decode_bytes(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).context("invalid UTF-8 content"),
        TextEncoding::Utf8Bom => {
            let content = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
            String::from_utf8(content.to_vec()).context("invalid UTF-8 BOM content")
        }
        TextEncoding::Ascii => String::from_utf8(bytes.to_vec()).context("invalid ASCII content"),
        TextEncoding::Utf16Le => {
            let content = bytes.strip_prefix(&UTF16_LE_BOM).unwrap_or(bytes);
            let u16s: Vec<u16> = content
                .chunks_exact(2)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                .collect();
            String::from_utf16(&u16s).context("invalid UTF-16 LE content")
        }
        TextEncoding::Utf16Be => {
            let content = bytes.strip_prefix(&UTF16_BE_BOM).unwrap_or(bytes);
            let u16s: Vec<u16> = content
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            String::from_utf16(&u16s).context("invalid UTF-16 BE content")
        }
        TextEncoding::Legacy(name) => {
            let encoding = encoding_rs::Encoding::for_label(name.as_bytes())
                .with_context(|| format!("unknown encoding: {name}"))?;
            let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
            if had_errors {
                anyhow::bail!("encoding errors while decoding as {name}");
            }
            Ok(decoded.into_owned())
        }
    }
}

/// Encodes a string into bytes using the specified encoding.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_string(text: &str, encoding: TextEncoding) -> Result<Vec<u8>> {
    match encoding {
        TextEncoding::Utf8 | TextEncoding::Ascii => Ok(text.as_bytes().to_vec()),
        TextEncoding::Utf8Bom => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            Ok(bytes)
        }
        TextEncoding::Utf16Le => {
            let mut bytes = UTF16_LE_BOM.to_vec();
            for code_unit in text.encode_utf16() {
                bytes.extend_from_slice(&code_unit.to_le_bytes());
            }
            Ok(bytes)
        }
        TextEncoding::Utf16Be => {
            let mut bytes = UTF16_BE_BOM.to_vec();
            for code_unit in text.encode_utf16() {
                bytes.extend_from_slice(&code_unit.to_be_bytes());
            }
            Ok(bytes)
        }
        TextEncoding::Legacy(name) => {
            let encoding = encoding_rs::Encoding::for_label(name.as_bytes())
                .with_context(|| format!("unknown encoding: {name}"))?;
            let (encoded, _, had_errors) = encoding.encode(text);
            if had_errors {
                anyhow::bail!("encoding errors while encoding as {name}");
            }
            Ok(encoded.into_owned())
        }
    }
}

/// Converts file text using `ending` to the internal `\r\n` form.
///
/// Only the separator of the given convention is rewritten, so stray
/// separators of other conventions survive a load/save cycle untouched.
/// With [`LineEnding::Ls`], a paragraph separator reads as two line breaks.
pub fn to_internal(text: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::CrLf => text.to_string(),
        LineEnding::Ls => text
            .replace('\u{2028}', INTERNAL_EOL)
            .replace('\u{2029}', "\r\n\r\n"),
        other => text.replace(other.as_str(), INTERNAL_EOL),
    }
}

/// Converts internal `\r\n` text to the file convention `ending`.
pub fn from_internal(text: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::CrLf => text.to_string(),
        other => text.replace(INTERNAL_EOL, other.as_str()),
    }
}
