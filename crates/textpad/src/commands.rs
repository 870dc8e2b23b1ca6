//! Subcommand implementations. Each returns the text to print.
//!
//! Document work runs on a [`DocumentHost`] thread; the calling thread only
//! formats the results.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use textpad_config::{AppConfig, ConfigCascade, EDITORCONFIG_FILE_NAME};
use textpad_core::{
    Document, DocumentError, DocumentHost, FindFlags, LineEnding, Session, TextEncoding,
};

/// Options of the `convert` subcommand.
#[derive(Debug, Default)]
pub struct ConvertOptions {
    pub eol: Option<String>,
    pub charset: Option<String>,
    pub indent: Option<usize>,
    pub output: Option<PathBuf>,
}

pub fn find_flags(regex: bool, case_sensitive: bool) -> FindFlags {
    let mut flags = FindFlags::empty();
    flags.set(FindFlags::REGEX, regex);
    flags.set(FindFlags::CASE_SENSITIVE, case_sensitive);
    flags
}

/// Runs `f` on a fresh host thread against the document loaded from `file`.
fn with_document<R, F>(config: AppConfig, file: PathBuf, f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce(&mut Session, &mut Document) -> Result<R, DocumentError> + Send + 'static,
{
    let mut host = DocumentHost::spawn(Session::new(config))?;
    let result = host.call(move |session, _docs| {
        let mut doc = session.new_document();
        doc.load(session, Some(&file), true)
            .map_err(anyhow::Error::from)
            .with_context(|| format!("failed to open {}", file.display()))?;
        f(session, &mut doc).map_err(anyhow::Error::from)
    })?;
    host.shutdown()?;
    result
}

pub fn info(config: AppConfig, file: PathBuf) -> Result<String> {
    with_document(config, file, |session, doc| {
        let mut out = String::new();
        let _ = writeln!(out, "name:        {}", doc.name());
        let _ = writeln!(out, "encoding:    {}", doc.encoding());
        let _ = writeln!(out, "line ending: {}", doc.line_ending());
        let _ = writeln!(out, "indentation: {}", doc.indent_style());
        let _ = writeln!(out, "tab width:   {}", doc.tab_width());
        let _ = writeln!(out, "lines:       {}", doc.storage().line_count());
        let _ = writeln!(out, "flags:       {:?}", doc.flags());
        let _ = writeln!(out, "status:      {}", doc.status_text(&mut session.events));
        Ok(out)
    })
}

pub fn cascade(file: &Path) -> String {
    let cascade = ConfigCascade::resolve(file);
    let mut out = String::new();
    for source in cascade.sources() {
        let _ = writeln!(out, "# {}", source.dir.join(EDITORCONFIG_FILE_NAME).display());
    }
    for (key, value) in cascade.resolved().iter() {
        let _ = writeln!(out, "{key} = {value}");
    }
    out
}

pub fn convert(config: AppConfig, file: PathBuf, options: ConvertOptions) -> Result<String> {
    let eol = options
        .eol
        .as_deref()
        .map(|name| {
            LineEnding::from_config_name(name)
                .with_context(|| format!("unknown line ending {name:?}"))
        })
        .transpose()?;
    let charset = options
        .charset
        .as_deref()
        .map(|label| {
            TextEncoding::from_label(label).with_context(|| format!("unknown charset {label:?}"))
        })
        .transpose()?;
    if let Some(mode) = options.indent {
        if mode > 8 {
            bail!("indentation mode {mode} is out of range 0..=8");
        }
    }

    let output = options.output;
    with_document(config, file, move |session, doc| {
        if let Some(eol) = eol {
            doc.set_line_ending(&mut session.events, eol);
        }
        if let Some(charset) = charset {
            doc.set_encoding(&mut session.events, charset);
        }
        if let Some(mode) = options.indent {
            let current = doc.indentation();
            doc.replace_indentation(&mut session.events, current, mode);
        }
        doc.save(session, output.as_deref())?;
        Ok(format!(
            "wrote {} ({}, {}, {})\n",
            doc.path().map(|p| p.display().to_string()).unwrap_or_default(),
            doc.encoding(),
            doc.line_ending(),
            doc.indent_style()
        ))
    })
}

pub fn find(config: AppConfig, file: PathBuf, pattern: String, flags: FindFlags) -> Result<String> {
    with_document(config, file, move |session, doc| {
        let mut out = String::new();
        let flags = flags - FindFlags::SEARCH_UP;
        let mut last = None;
        // Each stealth find searches on from the end of the previous match.
        while doc.find(session, &pattern, flags, true)? {
            let span = doc.selection();
            // An empty match would be found again at the same spot.
            if last == Some(span) {
                break;
            }
            let storage = doc.storage();
            let line = storage.line_of_offset(span.0);
            let col = span.0 - storage.line_start(line);
            let _ = writeln!(out, "{}:{}: {}", line + 1, col + 1, storage.line(line, None));
            last = Some(span);
        }
        Ok(out)
    })
}

pub fn replace(
    config: AppConfig,
    file: PathBuf,
    pattern: String,
    replacement: String,
    flags: FindFlags,
    output: Option<PathBuf>,
) -> Result<String> {
    with_document(config, file, move |session, doc| {
        let count = doc.replace(session, &pattern, &replacement, flags, true)?;
        if count > 0 || output.is_some() {
            doc.save(session, output.as_deref())?;
        }
        Ok(format!("{count} replacement(s)\n"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use textpad_config::EditorConfigOverride;

    fn config() -> AppConfig {
        AppConfig {
            editorconfig_override: EditorConfigOverride::Disabled,
            ..Default::default()
        }
    }

    #[test]
    fn test_info_reports_detected_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x\r\n    y\r\n").unwrap();
        let out = info(config(), path).unwrap();
        assert!(out.contains("name:        a.txt"));
        assert!(out.contains("line ending: CRLF"));
        assert!(out.contains("lines:       3"));
    }

    #[test]
    fn test_info_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = info(config(), dir.path().join("none.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open"));
    }

    #[test]
    fn test_cascade_lists_sources_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".editorconfig"),
            "root = true\n[*.md]\nindent_style = tab\n",
        )
        .unwrap();
        let out = cascade(&dir.path().join("readme.md"));
        assert!(out.starts_with("# "));
        assert!(out.contains("indent_style = tab\n"));
        assert!(!cascade(&dir.path().join("main.rs")).contains("indent_style"));
    }

    #[test]
    fn test_convert_to_lf_and_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        let out_path = dir.path().join("out.txt");
        fs::write(&path, "a\r\n\tb\r\n").unwrap();
        let options = ConvertOptions {
            eol: Some("lf".into()),
            indent: Some(2),
            output: Some(out_path.clone()),
            ..Default::default()
        };
        convert(config(), path.clone(), options).unwrap();
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "a\n  b\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\r\n\tb\r\n");
    }

    #[test]
    fn test_convert_rejects_unknown_names() {
        let options = ConvertOptions {
            eol: Some("nl".into()),
            ..Default::default()
        };
        assert!(convert(config(), PathBuf::from("unused"), options).is_err());
    }

    #[test]
    fn test_find_lists_each_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "Foo bar\nfoo\n").unwrap();
        let out = find(config(), path, "foo".into(), find_flags(false, false)).unwrap();
        assert_eq!(out, "1:1: Foo bar\n2:1: foo\n");
    }

    #[test]
    fn test_find_reports_every_match_on_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "ab ab\nab\n").unwrap();
        let out = find(config(), path, "ab".into(), find_flags(false, true)).unwrap();
        assert_eq!(out, "1:1: ab ab\n1:4: ab ab\n2:1: ab\n");
    }

    #[test]
    fn test_find_empty_regex_match_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "abc").unwrap();
        let out = find(config(), path, "x*".into(), find_flags(true, false)).unwrap();
        assert_eq!(out, "1:1: abc\n");
    }

    #[test]
    fn test_replace_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.txt");
        fs::write(&path, "k=1\nk=2\n").unwrap();
        let out = replace(
            config(),
            path.clone(),
            r"k=(\d)".into(),
            "v=$1".into(),
            find_flags(true, true),
            None,
        )
        .unwrap();
        assert_eq!(out, "2 replacement(s)\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "v=1\nv=2\n");
    }
}
