//! Downstream editor interface used by the method handlers.
//!
//! Positions are 0-based in this interface. Handlers convert to the 1-based
//! line/column numbers some methods expose on the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::EditorResult;

/// A 0-based line/character position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A span between two positions. `end` is the active (cursor) end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `at`
    #[inline]
    pub const fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Summary of the active document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub language: String,
    pub line_count: usize,
    pub cursor: Position,
}

/// Full contents of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub path: PathBuf,
    pub text: String,
    pub line_count: usize,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub path: PathBuf,
    pub is_active: bool,
    pub is_dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

/// Current selection and the text it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInfo {
    pub range: Range,
    pub text: String,
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub range: Range,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub id: String,
    pub display_name: String,
    pub version: String,
    pub is_active: bool,
    pub description: String,
}

/// Kind of notification shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// Operations the bridge can ask of an editor.
///
/// Implementations must be shareable across the dispatcher's concurrent
/// request tasks.
#[async_trait]
pub trait Editor: Send + Sync {
    async fn active_document(&self) -> Option<DocumentInfo>;

    async fn open_tabs(&self) -> Vec<TabInfo>;

    /// Open a document and make it active.
    async fn open_document(&self, path: &Path) -> EditorResult<()>;

    /// Write a new file, then open it.
    async fn create_document(&self, path: &Path, content: &str) -> EditorResult<()>;

    /// Save the active document and return its path.
    async fn save_active(&self) -> EditorResult<PathBuf>;

    /// Close the given document, or the active one when `path` is `None`.
    async fn close_document(&self, path: Option<&Path>) -> EditorResult<()>;

    async fn workspace_folders(&self) -> Vec<WorkspaceFolder>;

    /// Run an editor command by identifier.
    async fn execute_command(&self, command: &str, args: Vec<Value>) -> EditorResult<Value>;

    async fn show_message(&self, kind: MessageKind, message: &str);

    /// Contents of a document, open or not.
    async fn read_document(&self, path: &Path) -> EditorResult<DocumentContent>;

    /// Insert into the active document at `at`, or at the cursor. Returns
    /// where the text went.
    async fn insert_text(&self, text: &str, at: Option<Position>) -> EditorResult<Position>;

    /// Text of the active document.
    async fn active_text(&self) -> EditorResult<String>;

    /// Replace the whole text of the active document.
    async fn replace_active_text(&self, text: String) -> EditorResult<()>;

    async fn selection(&self) -> EditorResult<SelectionInfo>;

    /// Select a range (clamped to the document) and reveal it.
    async fn set_selection(&self, range: Range) -> EditorResult<()>;

    /// Diagnostics of the active document.
    async fn diagnostics(&self) -> EditorResult<(PathBuf, Vec<Diagnostic>)>;

    async fn run_task(&self, name: &str) -> EditorResult<()>;

    /// Open a terminal and return its name.
    async fn open_terminal(&self, name: &str, cwd: Option<&Path>) -> EditorResult<String>;

    /// Send a line to the named terminal, the active one, or a new one.
    /// Returns the name of the terminal used.
    async fn send_terminal_text(&self, text: &str, terminal: Option<&str>) -> EditorResult<String>;

    async fn extensions(&self) -> Vec<ExtensionInfo>;

    async fn install_extension(&self, id: &str) -> EditorResult<()>;

    /// Name of the current color theme, if known.
    async fn theme(&self) -> Option<String>;

    async fn set_theme(&self, name: &str) -> EditorResult<()>;
}

/// Name used for terminals opened without an explicit name.
pub const DEFAULT_TERMINAL_NAME: &str = "Bridge Terminal";

/// Editor command identifiers the standard handlers rely on.
pub mod commands {
    pub const FIND_IN_FILES: &str = "workbench.action.findInFiles";
    pub const FORMAT_DOCUMENT: &str = "editor.action.formatDocument";
    pub const SPLIT_EDITOR: &str = "workbench.action.splitEditor";
    pub const SPLIT_EDITOR_DOWN: &str = "workbench.action.splitEditorDown";
    pub const SAVE_ALL: &str = "workbench.action.files.saveAll";
    pub const CLOSE_ALL_EDITORS: &str = "workbench.action.closeAllEditors";
    pub const CLOSE_ACTIVE_EDITOR: &str = "workbench.action.closeActiveEditor";
    pub const INSTALL_EXTENSION: &str = "workbench.extensions.installExtension";
}
