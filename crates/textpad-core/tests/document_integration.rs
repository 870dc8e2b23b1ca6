use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use textpad_config::{AppConfig, EditorConfigOverride, EDITORCONFIG_FILE_NAME};
use textpad_core::{
    DocumentFlags, DocumentHost, FindFlags, LineEnding, Session, TextEncoding,
};

fn session(mode: EditorConfigOverride) -> Session {
    Session::new(AppConfig {
        editorconfig_override: mode,
        ..Default::default()
    })
}

fn write_editorconfig(dir: &Path, body: &str) {
    fs::write(dir.join(EDITORCONFIG_FILE_NAME), format!("root = true\n{body}")).unwrap();
}

// ── Load and save ────────────────────────────────────────────────────

#[test]
fn test_lf_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abc.txt");
    fs::write(&path, "a\nb\nc").unwrap();

    let mut s = session(EditorConfigOverride::Disabled);
    let mut doc = s.new_document();
    doc.load(&mut s, Some(&path), true).unwrap();
    assert_eq!(doc.line_ending(), LineEnding::Lf);
    assert_eq!(doc.text(), "a\r\nb\r\nc");
    assert_eq!(doc.name(), "abc.txt");

    let out = dir.path().join("out.txt");
    doc.save(&mut s, Some(&out)).unwrap();
    assert_eq!(fs::read(&out).unwrap(), b"a\nb\nc");
}

#[test]
fn test_unedited_save_preserves_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let samples: [&[u8]; 4] = [
        b"plain\r\nwindows\r\n",
        "caf\u{e9}\nna\u{ef}ve\n".as_bytes(),
        b"\xEF\xBB\xBFbom\nline",
        b"\xFF\xFEh\x00i\x00\n\x00",
    ];
    let mut s = session(EditorConfigOverride::Disabled);
    for (i, bytes) in samples.iter().enumerate() {
        let path = dir.path().join(format!("sample{i}.txt"));
        fs::write(&path, bytes).unwrap();
        let mut doc = s.new_document();
        doc.load(&mut s, Some(&path), true).unwrap();
        doc.save(&mut s, None).unwrap();
        assert_eq!(fs::read(&path).unwrap(), *bytes, "sample {i}");
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = Session::default();
    let mut doc = s.new_document();
    let err = doc
        .load(&mut s, Some(&dir.path().join("nope.txt")), true)
        .unwrap_err();
    assert!(err.code().is_some_and(|c| c < 0));
    assert_eq!(doc.name(), textpad_core::UNTITLED);
}

#[test]
fn test_stale_after_external_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("watched.txt");
    fs::write(&path, "v1").unwrap();

    let mut s = session(EditorConfigOverride::Disabled);
    let mut doc = s.new_document();
    doc.load(&mut s, Some(&path), true).unwrap();
    assert!(!doc.is_stale_on_disk(&s));

    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(3600))
        .unwrap();
    assert!(doc.is_stale_on_disk(&s));

    fs::write(&path, "v2").unwrap();
    doc.reload(&mut s).unwrap();
    assert_eq!(doc.text(), "v2");
}

// ── .editorconfig ────────────────────────────────────────────────────

#[test]
fn test_cascade_overrides_detected_line_ending() {
    let dir = tempfile::tempdir().unwrap();
    write_editorconfig(
        dir.path(),
        "[*.txt]\nend_of_line = lf\ntrim_trailing_whitespace = true\n",
    );
    let path = dir.path().join("notes.txt");
    fs::write(&path, "x  \r\ny\r\n").unwrap();

    let mut s = session(EditorConfigOverride::AfterDetection);
    let mut doc = s.new_document();
    doc.load(&mut s, Some(&path), true).unwrap();
    assert_eq!(doc.line_ending(), LineEnding::Lf);
    assert!(doc.flags().contains(DocumentFlags::TRIM_TRAILING_WHITESPACE));
    assert_eq!(
        doc.resolved_config().and_then(|c| c.get("end_of_line")),
        Some("lf")
    );

    doc.save(&mut s, None).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"x\ny\n");
}

#[test]
fn test_cascade_before_and_after_detection_differ() {
    let dir = tempfile::tempdir().unwrap();
    write_editorconfig(dir.path(), "[*.py]\nindent_style = space\n");
    let path = dir.path().join("m.py");
    fs::write(&path, "def f():\n  return 1\n").unwrap();

    let mut after = session(EditorConfigOverride::AfterDetection);
    let mut doc = after.new_document();
    doc.load(&mut after, Some(&path), true).unwrap();
    assert_eq!((doc.indentation(), doc.tab_width()), (2, 2));

    let mut before = session(EditorConfigOverride::BeforeDetection);
    let mut doc = before.new_document();
    doc.load(&mut before, Some(&path), true).unwrap();
    assert_eq!((doc.indentation(), doc.tab_width()), (4, 4));

    let mut off = session(EditorConfigOverride::Disabled);
    let mut doc = off.new_document();
    doc.load(&mut off, Some(&path), true).unwrap();
    assert_eq!(doc.indentation(), 2);
    assert!(doc.resolved_config().is_none());
}

#[test]
fn test_cascade_charset_applies_before_decoding() {
    let dir = tempfile::tempdir().unwrap();
    write_editorconfig(dir.path(), "[*]\ncharset = utf-16le\n");
    let path = dir.path().join("wide.txt");
    fs::write(&path, b"h\x00i\x00").unwrap();

    let mut s = session(EditorConfigOverride::BeforeDetection);
    let mut doc = s.new_document();
    doc.load(&mut s, Some(&path), true).unwrap();
    assert_eq!(doc.encoding(), TextEncoding::Utf16Le);
    assert_eq!(doc.text(), "hi");
}

// ── Undo ─────────────────────────────────────────────────────────────

#[test]
fn test_typed_run_undoes_as_one_step() {
    let mut s = Session::default();
    let mut doc = s.new_document();
    for ch in ["h", "e", "l", "l", "o"] {
        doc.insert_text(&mut s.events, ch);
    }
    assert_eq!(doc.history().len(), 1);
    assert!(doc.undo(&mut s.events));
    assert_eq!(doc.text(), "");
    assert!(doc.redo(&mut s.events));
    assert_eq!(doc.text(), "hello");
}

#[test]
fn test_backspace_run_restores_exactly() {
    let mut s = Session::default();
    let mut doc = s.new_document();
    doc.set_text("keep this");
    doc.set_selection(9, 9);
    for _ in 0..5 {
        doc.backspace(&mut s.events);
    }
    assert_eq!(doc.text(), "keep");
    assert_eq!(doc.history().len(), 1);
    doc.undo(&mut s.events);
    assert_eq!(doc.text(), "keep this");
}

#[test]
fn test_oldest_undo_state_is_evicted() {
    let mut s = Session::default();
    let mut doc = s.new_document();
    for _ in 0..60 {
        doc.set_selection(0, 0);
        doc.insert_text(&mut s.events, "a");
    }
    assert_eq!(doc.history().len(), 50);
    for _ in 0..50 {
        assert!(doc.undo(&mut s.events));
    }
    assert!(!doc.undo(&mut s.events));
    assert_eq!(doc.text(), "a".repeat(10));
}

// ── Host ─────────────────────────────────────────────────────────────

#[test]
fn test_host_load_find_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.txt");
    fs::write(&path, "Foo bar foo").unwrap();

    let host = DocumentHost::spawn(session(EditorConfigOverride::Disabled)).unwrap();
    let load_path = path.clone();
    host.call(move |session, docs| {
        let mut doc = session.new_document();
        doc.load(session, Some(&load_path), true)?;
        docs.push(doc);
        Ok::<_, textpad_core::DocumentError>(())
    })
    .unwrap()
    .unwrap();

    let spans = host
        .call(|session, docs| {
            let doc = &mut docs[0];
            let mut spans = Vec::new();
            if doc.find(session, "foo", FindFlags::empty(), false).unwrap() {
                spans.push(doc.selection());
            }
            while doc.find_next(session).unwrap() {
                spans.push(doc.selection());
            }
            spans
        })
        .unwrap();
    assert_eq!(spans, vec![(0, 3), (8, 11)]);

    host.call(|session, docs| {
        let doc = &mut docs[0];
        // The last find left "foo" selected; replace across the whole text.
        doc.set_selection(0, 0);
        doc.replace(session, "bar", "baz", FindFlags::empty(), true)?;
        doc.save(session, None)
    })
    .unwrap()
    .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "Foo baz foo");
}
