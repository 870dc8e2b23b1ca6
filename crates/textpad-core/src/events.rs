//! Session-scoped event hooks and alerts.
//!
//! Hooks are plain closures stored per event kind. Each registration gets a
//! connection id (the first is 101) that can later be passed to
//! [`EventRegistry::disconnect`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::encoding::{LineEnding, TextEncoding};

/// Connection id of a registered hook.
pub type HookId = u32;

const FIRST_HOOK_ID: HookId = 101;

/// What an enter hook wants done with a line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
    /// Insert a bare line break, skipping auto-indentation.
    Suppress,
    /// Auto-indent, then add (positive) or remove (negative) indent levels.
    OverrideIndent(i32),
    /// Auto-indent, then insert this text after the indentation.
    OverrideText(String),
    /// Default handling.
    Continue,
}

/// A document attribute that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrChange {
    Name(String),
    Encoding(TextEncoding),
    LineEnding(LineEnding),
    Indentation(usize),
    TabWidth(usize),
    AutoLineBreak(bool),
    ReadOnly(bool),
}

/// A user-facing notice that an action could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    NothingToUndo,
    NothingToRedo,
    /// Find-next without any previous search.
    NeedFindSpec,
    NotFound { search_text: String },
    /// Backspace inside leading indentation was blocked.
    IndentProtected,
    ReadOnly,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingToUndo => write!(f, "Nothing to undo"),
            Self::NothingToRedo => write!(f, "Nothing to redo"),
            Self::NeedFindSpec => write!(f, "Nothing to search for yet"),
            Self::NotFound { search_text } => write!(f, "Not found: {search_text}"),
            Self::IndentProtected => write!(f, "Indentation is protected"),
            Self::ReadOnly => write!(f, "Document is read-only"),
        }
    }
}

type LoadHook = dyn FnMut(&Document, &str) -> Option<String> + Send;
type SaveHook = dyn FnMut(&Document, &str) -> Option<String> + Send;
type BeforeSaveHook = dyn FnMut(&Document, &Path) -> Option<PathBuf> + Send;
type EnterHook = dyn FnMut(&Document, &str, usize) -> HookResult + Send;
type CloseHook = dyn FnMut(&Document) -> bool + Send;
type AttrChangeHook = dyn FnMut(&Document, &AttrChange) + Send;
type StatusHook = dyn FnMut(&Document, &str) -> Option<String> + Send;
type AlertListener = dyn FnMut(&Alert) + Send;

struct Slots<F: ?Sized> {
    entries: Vec<(HookId, Box<F>)>,
}

impl<F: ?Sized> Default for Slots<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> Slots<F> {
    fn add(&mut self, id: HookId, hook: Box<F>) -> HookId {
        self.entries.push((id, hook));
        id
    }

    fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    fn hooks(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, h)| h)
    }
}

/// Registered hooks and alert listeners for one editing session.
pub struct EventRegistry {
    next_id: HookId,
    load: Slots<LoadHook>,
    save: Slots<SaveHook>,
    before_save: Slots<BeforeSaveHook>,
    enter: Slots<EnterHook>,
    close: Slots<CloseHook>,
    attr_change: Slots<AttrChangeHook>,
    status: Slots<StatusHook>,
    alert: Slots<AlertListener>,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self {
            next_id: FIRST_HOOK_ID,
            load: Slots::default(),
            save: Slots::default(),
            before_save: Slots::default(),
            enter: Slots::default(),
            close: Slots::default(),
            attr_change: Slots::default(),
            status: Slots::default(),
            alert: Slots::default(),
        }
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> HookId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Called with the decoded text after load; may return replacement text.
    pub fn on_load(
        &mut self,
        hook: impl FnMut(&Document, &str) -> Option<String> + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.load.add(id, Box::new(hook))
    }

    /// Called with the text about to be serialized; may return replacement text.
    pub fn on_save(
        &mut self,
        hook: impl FnMut(&Document, &str) -> Option<String> + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.save.add(id, Box::new(hook))
    }

    /// Called with the target path before writing; may redirect the save.
    pub fn on_before_save(
        &mut self,
        hook: impl FnMut(&Document, &Path) -> Option<PathBuf> + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.before_save.add(id, Box::new(hook))
    }

    /// Called on a line break with the line text up to the caret and its index.
    pub fn on_enter(
        &mut self,
        hook: impl FnMut(&Document, &str, usize) -> HookResult + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.enter.add(id, Box::new(hook))
    }

    /// Called before a document closes; returning `false` vetoes the close.
    pub fn on_close(&mut self, hook: impl FnMut(&Document) -> bool + Send + 'static) -> HookId {
        let id = self.allocate();
        self.close.add(id, Box::new(hook))
    }

    pub fn on_attr_change(
        &mut self,
        hook: impl FnMut(&Document, &AttrChange) + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.attr_change.add(id, Box::new(hook))
    }

    /// Called with the status line text; may return replacement text.
    pub fn on_status(
        &mut self,
        hook: impl FnMut(&Document, &str) -> Option<String> + Send + 'static,
    ) -> HookId {
        let id = self.allocate();
        self.status.add(id, Box::new(hook))
    }

    pub fn on_alert(&mut self, listener: impl FnMut(&Alert) + Send + 'static) -> HookId {
        let id = self.allocate();
        self.alert.add(id, Box::new(listener))
    }

    /// Removes the hook registered under `id`. Returns `false` if none was.
    pub fn disconnect(&mut self, id: HookId) -> bool {
        self.load.remove(id)
            || self.save.remove(id)
            || self.before_save.remove(id)
            || self.enter.remove(id)
            || self.close.remove(id)
            || self.attr_change.remove(id)
            || self.status.remove(id)
            || self.alert.remove(id)
    }

    pub(crate) fn emit_load(&mut self, doc: &Document, text: String) -> String {
        self.load
            .hooks()
            .fold(text, |text, hook| hook(doc, &text).unwrap_or(text))
    }

    pub(crate) fn emit_save(&mut self, doc: &Document, text: String) -> String {
        self.save
            .hooks()
            .fold(text, |text, hook| hook(doc, &text).unwrap_or(text))
    }

    pub(crate) fn emit_before_save(&mut self, doc: &Document, path: PathBuf) -> PathBuf {
        self.before_save
            .hooks()
            .fold(path, |path, hook| hook(doc, &path).unwrap_or(path))
    }

    /// The first hook answering something other than `Continue` wins.
    pub(crate) fn emit_enter(&mut self, doc: &Document, line: &str, line_no: usize) -> HookResult {
        for hook in self.enter.hooks() {
            match hook(doc, line, line_no) {
                HookResult::Continue => {}
                other => return other,
            }
        }
        HookResult::Continue
    }

    /// Every hook runs; any `false` vetoes.
    pub(crate) fn emit_close(&mut self, doc: &Document) -> bool {
        self.close
            .hooks()
            .fold(true, |allowed, hook| hook(doc) && allowed)
    }

    pub(crate) fn emit_attr_change(&mut self, doc: &Document, change: &AttrChange) {
        tracing::debug!(?change, "document attribute changed");
        for hook in self.attr_change.hooks() {
            hook(doc, change);
        }
    }

    pub(crate) fn emit_status(&mut self, doc: &Document, text: String) -> String {
        self.status
            .hooks()
            .fold(text, |text, hook| hook(doc, &text).unwrap_or(text))
    }

    /// Reports an alert to every listener.
    pub fn alert(&mut self, alert: Alert) {
        tracing::debug!("alert: {alert}");
        for listener in self.alert.hooks() {
            listener(&alert);
        }
    }
}
