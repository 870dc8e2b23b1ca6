//! File I/O for documents.
//!
//! Handles loading files (with format detection and the `.editorconfig`
//! cascade), saving documents back, closing, and reload. Raw byte access
//! goes through a [`FileIo`] so hosts can redirect it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use textpad_config::{ConfigCascade, EditorConfigOverride, ResolvedConfig};

use crate::encoding::{encode_string, from_internal, INTERNAL_EOL};
use crate::error::DocumentError;
use crate::events::EventRegistry;
use crate::format::{FormatDefaults, FormatDetector, FormatParams};
use crate::session::Session;

use super::{name_for_path, CloseDecision, DocState, Document, DocumentFlags};

/// Raw file access used by documents.
pub trait FileIo: Send {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn modified_time(&self, path: &Path) -> io::Result<SystemTime>;
    fn write_stdout(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// [`FileIo`] on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskIo;

impl FileIo for DiskIo {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn modified_time(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn write_stdout(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()
    }
}

/// Removes spaces and tabs before every line break and at the end.
fn trim_trailing_whitespace(text: &str) -> String {
    text.split(INTERNAL_EOL)
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join(INTERNAL_EOL)
}

/// What a save as may change before anything is written.
struct SaveTarget {
    path: Option<PathBuf>,
    name: String,
    flags: DocumentFlags,
    params: FormatParams,
    resolved_config: Option<ResolvedConfig>,
}

impl SaveTarget {
    fn of(doc: &Document) -> Self {
        Self {
            path: doc.path.clone(),
            name: doc.name.clone(),
            flags: doc.flags,
            params: doc.params,
            resolved_config: doc.resolved_config.clone(),
        }
    }

    fn restore(self, doc: &mut Document, events: &mut EventRegistry) {
        doc.path = self.path;
        doc.flags = self.flags;
        doc.params = self.params;
        doc.resolved_config = self.resolved_config;
        if doc.name != self.name {
            doc.set_name(events, self.name);
        }
    }
}

impl Document {
    /// Loads the document from `path`, or from its own path when `None`.
    ///
    /// With `guess_format`, every format parameter is detected afresh and
    /// the `.editorconfig` cascade is consulted according to the session's
    /// [`EditorConfigOverride`]. Without it, parameters already set are
    /// kept and only unset ones are detected.
    ///
    /// # Errors
    ///
    /// [`DocumentError::ReloadRefused`] when no path is known or the
    /// document must not be reloaded, [`DocumentError::Io`] when the file
    /// cannot be read, [`DocumentError::Codec`] when it cannot be decoded.
    pub fn load(
        &mut self,
        session: &mut Session,
        path: Option<&Path>,
        guess_format: bool,
    ) -> Result<(), DocumentError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None if self.flags.contains(DocumentFlags::NO_RELOAD) => {
                return Err(DocumentError::ReloadRefused)
            }
            None => self.path.clone().ok_or(DocumentError::ReloadRefused)?,
        };
        let bytes = session
            .io
            .read(&path)
            .map_err(|e| DocumentError::io(&path, e))?;

        let previous = self.state;
        self.state = DocState::Loading;
        let result = self.install(session, &path, &bytes, guess_format);
        if result.is_err() {
            self.state = previous;
        }
        result
    }

    fn install(
        &mut self,
        session: &mut Session,
        path: &Path,
        bytes: &[u8],
        guess_format: bool,
    ) -> Result<(), DocumentError> {
        let mode = if guess_format {
            session.config.editorconfig_override
        } else {
            EditorConfigOverride::Disabled
        };
        let resolved = mode
            .is_enabled()
            .then(|| ConfigCascade::resolve(path).resolved());

        let mut pinned = if guess_format {
            FormatParams::default()
        } else {
            self.params
        };
        if let (EditorConfigOverride::BeforeDetection, Some(config)) = (mode, &resolved) {
            pinned.apply_config(config);
        }

        let detector = FormatDetector::new(FormatDefaults::from_config(&session.config));
        let detected = detector.detect(bytes, &pinned)?;

        let mut params = FormatParams {
            encoding: Some(detected.encoding),
            line_ending: Some(detected.line_ending),
            indentation: Some(detected.indentation),
            tab_width: Some(detected.tab_width),
        };
        if let (EditorConfigOverride::AfterDetection, Some(config)) = (mode, &resolved) {
            params.apply_config(config);
        }

        self.path = Some(path.to_path_buf());
        self.set_name(&mut session.events, name_for_path(path));
        self.apply_params(&mut session.events, params);
        if let Some(config) = &resolved {
            self.apply_config_flags(config);
        }
        self.resolved_config = resolved;

        let text = session.events.emit_load(self, detected.text);
        self.storage.set_text(&text);
        self.history.clear();
        self.state = DocState::Ready;
        self.last_saved = Some(Local::now());
        tracing::info!(
            "loaded {} ({}, {}, {} chars)",
            path.display(),
            self.encoding(),
            self.line_ending(),
            self.storage.len_chars()
        );
        Ok(())
    }

    /// Re-reads the document from its own path, keeping its format.
    ///
    /// # Errors
    ///
    /// See [`Document::load`].
    pub fn reload(&mut self, session: &mut Session) -> Result<(), DocumentError> {
        self.load(session, None, false)
    }

    /// The bytes a save would write: save hooks applied, optional
    /// whitespace cleanup, line breaks and encoding converted.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Codec`] if the text cannot be encoded.
    pub fn serialize(&self, events: &mut EventRegistry) -> Result<Vec<u8>, DocumentError> {
        let mut text = events.emit_save(self, self.storage.text());
        if self.flags.contains(DocumentFlags::TRIM_TRAILING_WHITESPACE) {
            text = trim_trailing_whitespace(&text);
        }
        if self.flags.contains(DocumentFlags::INSERT_FINAL_NEWLINE)
            && !text.is_empty()
            && !text.ends_with(INTERNAL_EOL)
        {
            text.push_str(INTERNAL_EOL);
        }
        let text = from_internal(&text, self.line_ending());
        Ok(encode_string(&text, self.encoding())?)
    }

    /// Saves the document, to `new_path` when given ("save as").
    ///
    /// A save as re-resolves the `.editorconfig` cascade for the new
    /// location when the session allows overrides, and clears the
    /// must-save-as and read-only flags. A failed save leaves the path,
    /// name, format and flags as they were.
    ///
    /// # Errors
    ///
    /// [`DocumentError::SaveRefused`] for documents that cannot be saved,
    /// [`DocumentError::PathRequired`] when a path is needed and missing
    /// (nothing changes in that case), [`DocumentError::Io`] when writing
    /// fails.
    pub fn save(
        &mut self,
        session: &mut Session,
        new_path: Option<&Path>,
    ) -> Result<(), DocumentError> {
        if self.flags.contains(DocumentFlags::NO_SAVE) {
            return Err(DocumentError::SaveRefused);
        }
        let needs_path = self.path.is_none() || self.flags.contains(DocumentFlags::MUST_SAVE_AS);
        if needs_path && new_path.is_none() {
            return Err(DocumentError::PathRequired);
        }

        let target = SaveTarget::of(self);
        let result = self.write_out(session, new_path);
        if result.is_err() {
            target.restore(self, &mut session.events);
        }
        result
    }

    fn write_out(
        &mut self,
        session: &mut Session,
        new_path: Option<&Path>,
    ) -> Result<(), DocumentError> {
        if let Some(path) = new_path {
            self.retarget(session, path);
        }
        let current = self.path.clone().ok_or(DocumentError::PathRequired)?;
        let target = session.events.emit_before_save(self, current);
        if target.as_os_str().is_empty() {
            return Err(DocumentError::PathRequired);
        }
        self.path = Some(target.clone());

        let bytes = self.serialize(&mut session.events)?;
        session
            .io
            .write(&target, &bytes)
            .map_err(|e| DocumentError::io(&target, e))?;

        self.state = DocState::Saved;
        self.last_saved = Some(Local::now());
        tracing::info!("saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }

    /// Points the document at `path` for a save as.
    ///
    /// Undone by [`SaveTarget::restore`] when the save then fails.
    fn retarget(&mut self, session: &mut Session, path: &Path) {
        self.path = Some(path.to_path_buf());
        self.set_name(&mut session.events, name_for_path(path));
        self.flags
            .remove(DocumentFlags::MUST_SAVE_AS | DocumentFlags::READ_ONLY);
        if !session.config.editorconfig_override.is_enabled() {
            return;
        }
        let resolved = ConfigCascade::resolve(path).resolved();
        let mut params = self.params;
        params.apply_config(&resolved);
        self.apply_params(&mut session.events, params);
        self.apply_config_flags(&resolved);
        self.resolved_config = Some(resolved);
    }

    /// Closes the document.
    ///
    /// Close hooks may veto. Documents flagged to write to stdout emit
    /// their content; unmodified documents close at once; modified ones
    /// follow `decision`. Returns whether the document is now closed.
    ///
    /// # Errors
    ///
    /// Save or stdout write failures. The document stays open.
    pub fn close(
        &mut self,
        session: &mut Session,
        decision: CloseDecision,
    ) -> Result<bool, DocumentError> {
        if self.state == DocState::Closed {
            return Ok(true);
        }
        if !session.events.emit_close(self) {
            tracing::debug!("close of {} vetoed by a hook", self.name);
            return Ok(false);
        }
        if self.flags.contains(DocumentFlags::WRITE_TO_STDOUT) {
            let bytes = self.serialize(&mut session.events)?;
            session
                .io
                .write_stdout(&bytes)
                .map_err(|e| DocumentError::io("<stdout>", e))?;
        } else if self.is_modified() {
            match decision {
                CloseDecision::Save => self.save(session, None)?,
                CloseDecision::Discard => {}
                CloseDecision::Cancel => return Ok(false),
            }
        }
        self.state = DocState::Closed;
        Ok(true)
    }

    /// Whether the file on disk changed after the last load or save.
    pub fn is_stale_on_disk(&self, session: &Session) -> bool {
        let (Some(path), Some(last_saved)) = (&self.path, self.last_saved) else {
            return false;
        };
        match session.io.modified_time(path) {
            Ok(mtime) => DateTime::<Local>::from(mtime) > last_saved,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{LineEnding, TextEncoding};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// In-memory file system shared with the test body.
    #[derive(Clone, Default)]
    struct MemIo {
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
        stdout: Arc<Mutex<Vec<u8>>>,
        /// When set, every file write fails with permission denied.
        deny_writes: Arc<Mutex<bool>>,
    }

    impl MemIo {
        fn with_file(path: &str, bytes: &[u8]) -> Self {
            let io = Self::default();
            io.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), bytes.to_vec());
            io
        }

        fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(Path::new(path)).cloned()
        }
    }

    impl FileIo for MemIo {
        fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
            if *self.deny_writes.lock().unwrap() {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), bytes.to_vec());
            Ok(())
        }

        fn modified_time(&self, _path: &Path) -> io::Result<SystemTime> {
            Err(io::Error::from(io::ErrorKind::Unsupported))
        }

        fn write_stdout(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.stdout.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }
    }

    fn session(io: &MemIo) -> Session {
        let config = textpad_config::AppConfig {
            editorconfig_override: EditorConfigOverride::Disabled,
            ..Default::default()
        };
        Session::new(config).with_io(io.clone())
    }

    // ── load ─────────────────────────────────────────────────────────

    #[test]
    fn test_load_detects_and_converts() {
        let io = MemIo::with_file("/mem/a.txt", b"a\nb\nc");
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();
        assert_eq!(doc.text(), "a\r\nb\r\nc");
        assert_eq!(doc.line_ending(), LineEnding::Lf);
        assert_eq!(doc.encoding(), TextEncoding::Ascii);
        assert_eq!(doc.name(), "a.txt");
        assert_eq!(doc.state(), DocState::Ready);
        assert!(doc.last_saved().is_some());
    }

    #[test]
    fn test_load_missing_file_keeps_state() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        let err = doc
            .load(&mut s, Some(Path::new("/mem/none.txt")), true)
            .unwrap_err();
        assert!(err.code().is_some_and(|c| c < 0));
        assert_eq!(doc.state(), DocState::Unloaded);
        assert!(doc.path().is_none());
    }

    #[test]
    fn test_load_hook_rewrites_text() {
        let io = MemIo::with_file("/mem/a.txt", b"abc");
        let mut s = session(&io);
        s.events.on_load(|_, text| Some(text.to_uppercase()));
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();
        assert_eq!(doc.text(), "ABC");
    }

    #[test]
    fn test_reload_keeps_format_and_honors_no_reload() {
        let io = MemIo::with_file("/mem/a.txt", b"x\ny");
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();

        io.files
            .lock()
            .unwrap()
            .insert(PathBuf::from("/mem/a.txt"), b"x\r\ny\nz".to_vec());
        doc.reload(&mut s).unwrap();
        assert_eq!(doc.line_ending(), LineEnding::Lf);
        assert_eq!(doc.text(), "x\r\r\ny\r\nz");

        doc.set_flag(DocumentFlags::NO_RELOAD, true);
        assert!(matches!(doc.reload(&mut s), Err(DocumentError::ReloadRefused)));
    }

    #[test]
    fn test_reload_without_path() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        assert!(matches!(doc.reload(&mut s), Err(DocumentError::ReloadRefused)));
    }

    // ── save ─────────────────────────────────────────────────────────

    #[test]
    fn test_save_round_trip_bytes() {
        let original = b"line one\nline two\n\tindented\n".to_vec();
        let io = MemIo::with_file("/mem/a.txt", &original);
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();
        doc.save(&mut s, Some(Path::new("/mem/b.txt"))).unwrap();
        assert_eq!(io.get("/mem/b.txt"), Some(original));
        assert_eq!(doc.state(), DocState::Saved);
        assert_eq!(doc.name(), "b.txt");
    }

    #[test]
    fn test_save_requires_path_without_side_effects() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.insert_text(&mut s.events, "hi");
        assert!(matches!(doc.save(&mut s, None), Err(DocumentError::PathRequired)));
        assert!(doc.is_modified());
        assert!(doc.path().is_none());
        assert!(io.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_save_as_keeps_previous_target() {
        let io = MemIo::with_file("/mem/a.txt", b"a");
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();
        doc.set_flag(DocumentFlags::READ_ONLY, true);
        doc.set_flag(DocumentFlags::MUST_SAVE_AS, true);
        let flags = doc.flags();

        *io.deny_writes.lock().unwrap() = true;
        let err = doc.save(&mut s, Some(Path::new("/mem/b.txt"))).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
        assert_eq!(doc.path(), Some(Path::new("/mem/a.txt")));
        assert_eq!(doc.name(), "a.txt");
        assert_eq!(doc.flags(), flags);
        assert_eq!(io.get("/mem/b.txt"), None);

        *io.deny_writes.lock().unwrap() = false;
        doc.save(&mut s, Some(Path::new("/mem/b.txt"))).unwrap();
        assert_eq!(doc.name(), "b.txt");
        assert!(!doc.flags().contains(DocumentFlags::MUST_SAVE_AS));
    }

    #[test]
    fn test_must_save_as_and_no_save() {
        let io = MemIo::with_file("/mem/a.txt", b"a");
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();

        doc.set_flag(DocumentFlags::MUST_SAVE_AS, true);
        assert!(matches!(doc.save(&mut s, None), Err(DocumentError::PathRequired)));
        doc.save(&mut s, Some(Path::new("/mem/c.txt"))).unwrap();
        assert!(!doc.flags().contains(DocumentFlags::MUST_SAVE_AS));

        doc.set_flag(DocumentFlags::NO_SAVE, true);
        assert!(matches!(doc.save(&mut s, None), Err(DocumentError::SaveRefused)));
    }

    #[test]
    fn test_save_applies_whitespace_flags_to_output_only() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.set_line_ending(&mut s.events, LineEnding::Lf);
        doc.set_text("a  \r\nb\t");
        doc.set_flag(DocumentFlags::TRIM_TRAILING_WHITESPACE, true);
        doc.set_flag(DocumentFlags::INSERT_FINAL_NEWLINE, true);
        doc.save(&mut s, Some(Path::new("/mem/w.txt"))).unwrap();
        assert_eq!(io.get("/mem/w.txt"), Some(b"a\nb\n".to_vec()));
        assert_eq!(doc.text(), "a  \r\nb\t");
    }

    #[test]
    fn test_save_hooks() {
        let io = MemIo::default();
        let mut s = session(&io);
        s.events.on_save(|_, text| Some(format!("{text}!")));
        s.events
            .on_before_save(|_, path| Some(path.with_extension("bak")));
        let mut doc = s.new_document();
        doc.set_text("x");
        doc.save(&mut s, Some(Path::new("/mem/h.txt"))).unwrap();
        assert_eq!(io.get("/mem/h.bak"), Some(b"x!".to_vec()));
        assert_eq!(doc.path(), Some(Path::new("/mem/h.bak")));
    }

    #[test]
    fn test_save_encodes_utf16() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.set_encoding(&mut s.events, TextEncoding::Utf16Le);
        doc.set_line_ending(&mut s.events, LineEnding::CrLf);
        doc.set_text("hi");
        doc.save(&mut s, Some(Path::new("/mem/u.txt"))).unwrap();
        assert_eq!(io.get("/mem/u.txt"), Some(vec![0xFF, 0xFE, b'h', 0, b'i', 0]));
    }

    // ── close ────────────────────────────────────────────────────────

    #[test]
    fn test_close_decisions() {
        let io = MemIo::with_file("/mem/a.txt", b"a");
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.load(&mut s, Some(Path::new("/mem/a.txt")), true).unwrap();
        doc.set_selection(1, 1);
        doc.insert_text(&mut s.events, "b");

        assert!(!doc.close(&mut s, CloseDecision::Cancel).unwrap());
        assert!(doc.is_modified());

        assert!(doc.close(&mut s, CloseDecision::Save).unwrap());
        assert_eq!(doc.state(), DocState::Closed);
        assert_eq!(io.get("/mem/a.txt"), Some(b"ab".to_vec()));
    }

    #[test]
    fn test_close_discard_and_unmodified() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        assert!(doc.close(&mut s, CloseDecision::Cancel).unwrap());

        let mut doc = s.new_document();
        doc.insert_text(&mut s.events, "x");
        assert!(doc.close(&mut s, CloseDecision::Discard).unwrap());
        assert!(io.files.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_save_without_path_fails_and_stays_open() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.insert_text(&mut s.events, "x");
        assert!(doc.close(&mut s, CloseDecision::Save).is_err());
        assert!(doc.is_modified());
    }

    #[test]
    fn test_close_hook_veto() {
        let io = MemIo::default();
        let mut s = session(&io);
        let id = s.events.on_close(|_| false);
        let mut doc = s.new_document();
        assert!(!doc.close(&mut s, CloseDecision::Discard).unwrap());
        s.events.disconnect(id);
        assert!(doc.close(&mut s, CloseDecision::Discard).unwrap());
    }

    #[test]
    fn test_close_writes_to_stdout() {
        let io = MemIo::default();
        let mut s = session(&io);
        let mut doc = s.new_document();
        doc.set_line_ending(&mut s.events, LineEnding::Lf);
        doc.set_text("a\r\nb");
        doc.set_flag(DocumentFlags::WRITE_TO_STDOUT, true);
        assert!(doc.close(&mut s, CloseDecision::Cancel).unwrap());
        assert_eq!(*io.stdout.lock().unwrap(), b"a\nb".to_vec());
    }

    // ── helpers ──────────────────────────────────────────────────────

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("a \t\r\n b  \r\n"), "a\r\n b\r\n");
        assert_eq!(trim_trailing_whitespace(""), "");
    }
}
