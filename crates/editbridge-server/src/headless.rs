//! In-process editor backed by the filesystem and in-memory buffers.
//!
//! Lets the dispatcher run without a GUI editor and serves as the fixture for
//! handler tests. Commands and notifications that would normally reach a
//! user are recorded so they can be inspected.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::editor::{
    commands, Diagnostic, DocumentContent, DocumentInfo, Editor, ExtensionInfo, MessageKind,
    Position, Range, SelectionInfo, TabInfo, WorkspaceFolder, DEFAULT_TERMINAL_NAME,
};
use crate::error::{EditorError, EditorResult};

const DEFAULT_THEME: &str = "Default Dark+";

/// A command passed to [`Editor::execute_command`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub command: String,
    pub args: Vec<Value>,
}

/// A notification passed to [`Editor::show_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownMessage {
    pub kind: MessageKind,
    pub text: String,
}

struct OpenDocument {
    path: PathBuf,
    text: String,
    language: String,
    dirty: bool,
    selection: Range,
}

impl OpenDocument {
    fn new(path: PathBuf, text: String) -> Self {
        let language = language_for(&path).to_string();
        Self {
            path,
            text,
            language,
            dirty: false,
            selection: Range::default(),
        }
    }
}

struct Terminal {
    name: String,
    cwd: Option<PathBuf>,
    input: Vec<String>,
}

struct HeadlessState {
    documents: Vec<OpenDocument>,
    active: Option<PathBuf>,
    terminals: Vec<Terminal>,
    active_terminal: Option<String>,
    theme: String,
    extensions: Vec<ExtensionInfo>,
    tasks: Vec<String>,
    started_tasks: Vec<String>,
    diagnostics: HashMap<PathBuf, Vec<Diagnostic>>,
    commands: Vec<ExecutedCommand>,
    messages: Vec<ShownMessage>,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            active: None,
            terminals: Vec::new(),
            active_terminal: None,
            theme: DEFAULT_THEME.to_string(),
            extensions: Vec::new(),
            tasks: Vec::new(),
            started_tasks: Vec::new(),
            diagnostics: HashMap::new(),
            commands: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl HeadlessState {
    fn document(&self, path: &Path) -> Option<&OpenDocument> {
        self.documents.iter().find(|doc| doc.path == path)
    }

    fn active_document(&self) -> Option<&OpenDocument> {
        self.active.as_deref().and_then(|path| self.document(path))
    }

    fn active_document_mut(&mut self) -> EditorResult<&mut OpenDocument> {
        let active = self.active.clone().ok_or(EditorError::NoActiveEditor)?;
        self.documents
            .iter_mut()
            .find(|doc| doc.path == active)
            .ok_or(EditorError::NoActiveEditor)
    }

    /// Insert or refresh a document and make it active.
    fn open(&mut self, path: PathBuf, text: String, reload: bool) {
        match self.documents.iter_mut().find(|doc| doc.path == path) {
            Some(doc) if reload => {
                doc.text = text;
                doc.dirty = false;
                doc.selection = Range::default();
            }
            Some(_) => {}
            None => self.documents.push(OpenDocument::new(path.clone(), text)),
        }
        self.active = Some(path);
    }

    fn remove(&mut self, path: &Path) -> bool {
        let before = self.documents.len();
        self.documents.retain(|doc| doc.path != path);
        if self.active.as_deref() == Some(path) {
            self.active = self.documents.last().map(|doc| doc.path.clone());
        }
        self.documents.len() != before
    }
}

/// Editor implementation without a user interface.
pub struct HeadlessEditor {
    workspace: Option<PathBuf>,
    state: Mutex<HeadlessState>,
}

impl HeadlessEditor {
    /// An editor with no workspace folder open.
    pub fn new() -> Self {
        Self {
            workspace: None,
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// An editor with `root` open as its single workspace folder.
    ///
    /// Relative paths in requests resolve against `root`.
    pub fn with_workspace(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace: Some(root.into()),
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// Make tasks available to `runTask`.
    pub fn with_tasks<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().tasks.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_extension(self, extension: ExtensionInfo) -> Self {
        self.lock().extensions.push(extension);
        self
    }

    /// Attach diagnostics to a file.
    pub fn set_diagnostics(&self, path: impl AsRef<Path>, diagnostics: Vec<Diagnostic>) {
        let path = self.resolve(path.as_ref());
        self.lock().diagnostics.insert(path, diagnostics);
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    pub fn executed_commands(&self) -> Vec<ExecutedCommand> {
        self.lock().commands.clone()
    }

    pub fn messages(&self) -> Vec<ShownMessage> {
        self.lock().messages.clone()
    }

    pub fn started_tasks(&self) -> Vec<String> {
        self.lock().started_tasks.clone()
    }

    /// Lines sent to the named terminal, if it exists.
    pub fn terminal_input(&self, name: &str) -> Option<Vec<String>> {
        self.lock()
            .terminals
            .iter()
            .find(|terminal| terminal.name == name)
            .map(|terminal| terminal.input.clone())
    }

    /// Working directory of the named terminal.
    pub fn terminal_cwd(&self, name: &str) -> Option<PathBuf> {
        self.lock()
            .terminals
            .iter()
            .find(|terminal| terminal.name == name)
            .and_then(|terminal| terminal.cwd.clone())
    }

    /// Whether a document has unsaved changes. `None` when it is not open.
    pub fn is_dirty(&self, path: impl AsRef<Path>) -> Option<bool> {
        let path = self.resolve(path.as_ref());
        self.lock().document(&path).map(|doc| doc.dirty)
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    async fn save_all(&self) -> EditorResult<()> {
        let dirty: Vec<(PathBuf, String)> = {
            let state = self.lock();
            state
                .documents
                .iter()
                .filter(|doc| doc.dirty)
                .map(|doc| (doc.path.clone(), doc.text.clone()))
                .collect()
        };

        for (path, text) in dirty {
            write_file(&path, &text).await?;
            let mut state = self.lock();
            if let Some(doc) = state.documents.iter_mut().find(|doc| doc.path == path) {
                doc.dirty = false;
            }
        }
        Ok(())
    }

    fn format_active(&self) {
        let mut state = self.lock();
        let Ok(doc) = state.active_document_mut() else {
            return;
        };
        let formatted = doc
            .text
            .split('\n')
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        if formatted != doc.text {
            doc.text = formatted;
            doc.dirty = true;
            doc.selection = clamp_range(&doc.text, doc.selection);
        }
    }

    fn install(&self, id: &str) {
        let mut state = self.lock();
        if state.extensions.iter().any(|ext| ext.id == id) {
            return;
        }
        state.extensions.push(ExtensionInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            version: "0.0.0".to_string(),
            is_active: false,
            description: String::new(),
        });
    }
}

impl Default for HeadlessEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Editor for HeadlessEditor {
    async fn active_document(&self) -> Option<DocumentInfo> {
        let state = self.lock();
        state.active_document().map(|doc| DocumentInfo {
            path: doc.path.clone(),
            language: doc.language.clone(),
            line_count: line_count(&doc.text),
            cursor: doc.selection.end,
        })
    }

    async fn open_tabs(&self) -> Vec<TabInfo> {
        let state = self.lock();
        state
            .documents
            .iter()
            .map(|doc| TabInfo {
                path: doc.path.clone(),
                is_active: state.active.as_deref() == Some(doc.path.as_path()),
                is_dirty: doc.dirty,
            })
            .collect()
    }

    async fn open_document(&self, path: &Path) -> EditorResult<()> {
        let path = self.resolve(path);
        {
            let mut state = self.lock();
            if state.document(&path).is_some() {
                state.active = Some(path);
                return Ok(());
            }
        }

        let text = read_file(&path).await?;
        self.lock().open(path, text, false);
        Ok(())
    }

    async fn create_document(&self, path: &Path, content: &str) -> EditorResult<()> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EditorError::io(parent, e))?;
        }
        write_file(&path, content).await?;
        self.lock().open(path, content.to_string(), true);
        Ok(())
    }

    async fn save_active(&self) -> EditorResult<PathBuf> {
        let (path, text) = {
            let state = self.lock();
            let doc = state.active_document().ok_or(EditorError::NoActiveEditor)?;
            (doc.path.clone(), doc.text.clone())
        };

        write_file(&path, &text).await?;

        let mut state = self.lock();
        if let Some(doc) = state.documents.iter_mut().find(|doc| doc.path == path) {
            doc.dirty = false;
        }
        Ok(path)
    }

    async fn close_document(&self, path: Option<&Path>) -> EditorResult<()> {
        let mut state = self.lock();
        match path {
            Some(path) => {
                let path = self.resolve(path);
                if !state.remove(&path) {
                    return Err(EditorError::NotOpen(path));
                }
            }
            None => {
                if let Some(active) = state.active.clone() {
                    state.remove(&active);
                }
            }
        }
        Ok(())
    }

    async fn workspace_folders(&self) -> Vec<WorkspaceFolder> {
        self.workspace
            .iter()
            .map(|root| WorkspaceFolder {
                name: root
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| root.display().to_string()),
                path: root.clone(),
            })
            .collect()
    }

    async fn execute_command(&self, command: &str, args: Vec<Value>) -> EditorResult<Value> {
        debug!(command, "Headless editor executing command");
        let first_arg = args.first().and_then(Value::as_str).map(str::to_owned);
        self.lock().commands.push(ExecutedCommand {
            command: command.to_string(),
            args,
        });

        match command {
            commands::SAVE_ALL => self.save_all().await?,
            commands::CLOSE_ALL_EDITORS => {
                let mut state = self.lock();
                state.documents.clear();
                state.active = None;
            }
            commands::CLOSE_ACTIVE_EDITOR => self.close_document(None).await?,
            commands::FORMAT_DOCUMENT => self.format_active(),
            commands::INSTALL_EXTENSION => {
                let id = first_arg
                    .ok_or_else(|| EditorError::command(command, "missing extension id"))?;
                self.install(&id);
            }
            // Only meaningful with a user interface
            commands::FIND_IN_FILES | commands::SPLIT_EDITOR | commands::SPLIT_EDITOR_DOWN => {}
            _ => return Err(EditorError::command(command, "command not found")),
        }
        Ok(Value::Null)
    }

    async fn show_message(&self, kind: MessageKind, message: &str) {
        info!(?kind, "{}", message);
        self.lock().messages.push(ShownMessage {
            kind,
            text: message.to_string(),
        });
    }

    async fn read_document(&self, path: &Path) -> EditorResult<DocumentContent> {
        let path = self.resolve(path);
        let open = {
            let state = self.lock();
            state.document(&path).map(|doc| doc.text.clone())
        };
        let text = match open {
            Some(text) => text,
            None => read_file(&path).await?,
        };

        Ok(DocumentContent {
            line_count: line_count(&text),
            language: language_for(&path).to_string(),
            path,
            text,
        })
    }

    async fn insert_text(&self, text: &str, at: Option<Position>) -> EditorResult<Position> {
        let mut state = self.lock();
        let doc = state.active_document_mut()?;

        let position = match at {
            Some(at) => clamp(&doc.text, at),
            None => doc.selection.end,
        };
        let offset = offset_at(&doc.text, position);
        doc.text.insert_str(offset, text);
        doc.dirty = true;
        if at.is_none() {
            doc.selection = Range::caret(position_at(&doc.text, offset + text.len()));
        }
        Ok(position)
    }

    async fn active_text(&self) -> EditorResult<String> {
        let state = self.lock();
        state
            .active_document()
            .map(|doc| doc.text.clone())
            .ok_or(EditorError::NoActiveEditor)
    }

    async fn replace_active_text(&self, text: String) -> EditorResult<()> {
        let mut state = self.lock();
        let doc = state.active_document_mut()?;
        if doc.text != text {
            doc.text = text;
            doc.dirty = true;
            doc.selection = clamp_range(&doc.text, doc.selection);
        }
        Ok(())
    }

    async fn selection(&self) -> EditorResult<SelectionInfo> {
        let state = self.lock();
        let doc = state.active_document().ok_or(EditorError::NoActiveEditor)?;
        let range = doc.selection;
        let (from, to) = if range.start <= range.end {
            (range.start, range.end)
        } else {
            (range.end, range.start)
        };
        let text = doc.text[offset_at(&doc.text, from)..offset_at(&doc.text, to)].to_string();
        Ok(SelectionInfo { range, text })
    }

    async fn set_selection(&self, range: Range) -> EditorResult<()> {
        let mut state = self.lock();
        let doc = state.active_document_mut()?;
        doc.selection = clamp_range(&doc.text, range);
        Ok(())
    }

    async fn diagnostics(&self) -> EditorResult<(PathBuf, Vec<Diagnostic>)> {
        let state = self.lock();
        let doc = state.active_document().ok_or(EditorError::NoActiveEditor)?;
        let diagnostics = state
            .diagnostics
            .get(&doc.path)
            .cloned()
            .unwrap_or_default();
        Ok((doc.path.clone(), diagnostics))
    }

    async fn run_task(&self, name: &str) -> EditorResult<()> {
        let mut state = self.lock();
        if !state.tasks.iter().any(|task| task == name) {
            return Err(EditorError::not_found("Task", name));
        }
        state.started_tasks.push(name.to_string());
        Ok(())
    }

    async fn open_terminal(&self, name: &str, cwd: Option<&Path>) -> EditorResult<String> {
        let cwd = cwd.map(|cwd| self.resolve(cwd));
        let mut state = self.lock();
        state.terminals.push(Terminal {
            name: name.to_string(),
            cwd,
            input: Vec::new(),
        });
        state.active_terminal = Some(name.to_string());
        Ok(name.to_string())
    }

    async fn send_terminal_text(&self, text: &str, terminal: Option<&str>) -> EditorResult<String> {
        let mut state = self.lock();
        let exists = |name: &String| state.terminals.iter().any(|t| &t.name == name);
        let target = terminal
            .map(str::to_owned)
            .filter(exists)
            .or_else(|| state.active_terminal.clone().filter(exists));

        let name = match target {
            Some(name) => name,
            None => {
                state.terminals.push(Terminal {
                    name: DEFAULT_TERMINAL_NAME.to_string(),
                    cwd: self.workspace.clone(),
                    input: Vec::new(),
                });
                DEFAULT_TERMINAL_NAME.to_string()
            }
        };

        // Last terminal with the name wins, matching the most recently opened
        if let Some(terminal) = state.terminals.iter_mut().rev().find(|t| t.name == name) {
            terminal.input.push(text.to_string());
        }
        state.active_terminal = Some(name.clone());
        Ok(name)
    }

    async fn extensions(&self) -> Vec<ExtensionInfo> {
        self.lock().extensions.clone()
    }

    async fn install_extension(&self, id: &str) -> EditorResult<()> {
        self.install(id);
        Ok(())
    }

    async fn theme(&self) -> Option<String> {
        Some(self.lock().theme.clone())
    }

    async fn set_theme(&self, name: &str) -> EditorResult<()> {
        self.lock().theme = name.to_string();
        Ok(())
    }
}

async fn read_file(path: &Path) -> EditorResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EditorError::io(path, e))
}

async fn write_file(path: &Path, text: &str) -> EditorResult<()> {
    tokio::fs::write(path, text)
        .await
        .map_err(|e| EditorError::io(path, e))
}

fn language_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    match extension {
        "rs" => "rust",
        "ts" => "typescript",
        "tsx" => "typescriptreact",
        "js" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "json" => "json",
        "md" => "markdown",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "html" => "html",
        "css" => "css",
        "sh" => "shellscript",
        _ => "plaintext",
    }
}

/// Number of lines, counting a trailing empty line the way editors do.
fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Byte offset of `at`, clamped to the document.
fn offset_at(text: &str, at: Position) -> usize {
    let mut offset = 0;
    for (index, line) in text.split('\n').enumerate() {
        if index == at.line as usize {
            let within = line
                .char_indices()
                .nth(at.character as usize)
                .map_or(line.len(), |(i, _)| i);
            return offset + within;
        }
        offset += line.len() + 1;
    }
    text.len()
}

fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let character = before[line_start..].chars().count();
    Position::new(line as u32, character as u32)
}

fn clamp(text: &str, at: Position) -> Position {
    position_at(text, offset_at(text, at))
}

fn clamp_range(text: &str, range: Range) -> Range {
    Range::new(clamp(text, range.start), clamp(text, range.end))
}
