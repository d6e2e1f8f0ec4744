//! Standard method handlers.
//!
//! Each handler decodes its params, calls one editor operation and shapes the
//! result with camelCase keys. Lines and columns are 1-based in `gotoLine`,
//! `selectText`, `getSelection` and `getDiagnostics`; everything else uses the
//! editor's 0-based positions.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::editor::{commands, MessageKind, Position, Range, DEFAULT_TERMINAL_NAME};
use crate::error::{EditorError, HandlerError, HandlerResult};
use crate::registry::{HandlerContext, MethodRegistry};

/// Every method in the standard table.
pub const STANDARD_METHODS: [&str; 28] = [
    "getActiveEditor",
    "getOpenTabs",
    "openFile",
    "createFile",
    "saveFile",
    "closeFile",
    "getWorkspaceInfo",
    "executeCommand",
    "showMessage",
    "getFileContent",
    "insertText",
    "searchInFiles",
    "replaceText",
    "gotoLine",
    "selectText",
    "getSelection",
    "formatDocument",
    "findAndReplace",
    "getDiagnostics",
    "runTask",
    "openTerminal",
    "sendTerminalCommand",
    "getExtensions",
    "installExtension",
    "getThemes",
    "changeTheme",
    "splitEditor",
    "closeAllTabs",
];

/// Themes reported by `getThemes`.
pub const BUILT_IN_THEMES: [&str; 10] = [
    "Default Dark+",
    "Default Light+",
    "Default High Contrast",
    "Monokai",
    "Solarized Dark",
    "Solarized Light",
    "Quiet Light",
    "Red",
    "Kimbie Dark",
    "Abyss",
];

pub(crate) fn install(registry: &mut MethodRegistry) {
    registry.insert("getActiveEditor", get_active_editor);
    registry.insert("getOpenTabs", get_open_tabs);
    registry.insert("openFile", open_file);
    registry.insert("createFile", create_file);
    registry.insert("saveFile", save_file);
    registry.insert("closeFile", close_file);
    registry.insert("getWorkspaceInfo", get_workspace_info);
    registry.insert("executeCommand", execute_command);
    registry.insert("showMessage", show_message);
    registry.insert("getFileContent", get_file_content);
    registry.insert("insertText", insert_text);
    registry.insert("searchInFiles", search_in_files);
    registry.insert("replaceText", replace_text);
    registry.insert("gotoLine", goto_line);
    registry.insert("selectText", select_text);
    registry.insert("getSelection", get_selection);
    registry.insert("formatDocument", format_document);
    registry.insert("findAndReplace", find_and_replace);
    registry.insert("getDiagnostics", get_diagnostics);
    registry.insert("runTask", run_task);
    registry.insert("openTerminal", open_terminal);
    registry.insert("sendTerminalCommand", send_terminal_command);
    registry.insert("getExtensions", get_extensions);
    registry.insert("installExtension", install_extension);
    registry.insert("getThemes", get_themes);
    registry.insert("changeTheme", change_theme);
    registry.insert("splitEditor", split_editor);
    registry.insert("closeAllTabs", close_all_tabs);
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, HandlerError> {
    serde_json::from_value(params).map_err(HandlerError::invalid_params)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn default_true() -> bool {
    true
}

fn default_column() -> u32 {
    1
}

/// Convert a 1-based wire number into a 0-based editor index.
fn zero_based(value: u32, name: &str) -> Result<u32, HandlerError> {
    value
        .checked_sub(1)
        .ok_or_else(|| HandlerError::invalid_params(format!("{name} must be at least 1")))
}

/// 1-based position as it appears on the wire
#[derive(Serialize)]
struct WirePosition {
    line: u32,
    character: u32,
}

impl From<Position> for WirePosition {
    fn from(position: Position) -> Self {
        Self {
            line: position.line + 1,
            character: position.character + 1,
        }
    }
}

async fn run_command(ctx: &HandlerContext, command: &str, args: Vec<Value>) -> HandlerResult {
    Ok(ctx
        .until_cancelled(ctx.editor.execute_command(command, args))
        .await??)
}

async fn active_editor_value(ctx: &HandlerContext) -> Value {
    match ctx.editor.active_document().await {
        Some(doc) => json!({
            "fileName": display(&doc.path),
            "language": doc.language,
            "lineCount": doc.line_count,
            "cursorPosition": {
                "line": doc.cursor.line,
                "character": doc.cursor.character,
            },
        }),
        None => Value::Null,
    }
}

async fn get_active_editor(ctx: HandlerContext, _params: Value) -> HandlerResult {
    Ok(active_editor_value(&ctx).await)
}

async fn get_open_tabs(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let tabs: Vec<Value> = ctx
        .editor
        .open_tabs()
        .await
        .into_iter()
        .map(|tab| {
            json!({
                "fileName": display(&tab.path),
                "isActive": tab.is_active,
                "isDirty": tab.is_dirty,
            })
        })
        .collect();
    Ok(Value::Array(tabs))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePathParams {
    file_path: PathBuf,
}

async fn open_file(ctx: HandlerContext, params: Value) -> HandlerResult {
    let FilePathParams { file_path } = parse(params)?;
    ctx.editor.open_document(&file_path).await?;
    Ok(json!({ "success": true, "filePath": display(&file_path) }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFileParams {
    file_path: PathBuf,
    #[serde(default)]
    content: Option<String>,
}

async fn create_file(ctx: HandlerContext, params: Value) -> HandlerResult {
    let CreateFileParams { file_path, content } = parse(params)?;
    ctx.editor
        .create_document(&file_path, content.as_deref().unwrap_or_default())
        .await?;
    Ok(json!({
        "success": true,
        "filePath": display(&file_path),
        "message": "File created and opened",
    }))
}

async fn save_file(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let path = ctx.editor.save_active().await?;
    Ok(json!({
        "success": true,
        "filePath": display(&path),
        "message": "File saved",
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseFileParams {
    #[serde(default)]
    file_path: Option<PathBuf>,
}

async fn close_file(ctx: HandlerContext, params: Value) -> HandlerResult {
    let CloseFileParams { file_path } = parse(params)?;
    ctx.editor.close_document(file_path.as_deref()).await?;
    Ok(match file_path {
        Some(path) => json!({
            "success": true,
            "filePath": display(&path),
            "message": "File closed",
        }),
        None => json!({ "success": true, "message": "Active file closed" }),
    })
}

async fn get_workspace_info(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let folders = ctx.editor.workspace_folders().await;
    if folders.is_empty() {
        return Ok(json!({ "hasWorkspace": false, "message": "No workspace open" }));
    }

    let folders: Vec<Value> = folders
        .into_iter()
        .map(|folder| json!({ "name": folder.name, "path": display(&folder.path) }))
        .collect();
    Ok(json!({
        "hasWorkspace": true,
        "folders": folders,
        "activeEditor": active_editor_value(&ctx).await,
    }))
}

#[derive(Deserialize)]
struct ExecuteCommandParams {
    command: String,
    #[serde(default)]
    args: Option<Vec<Value>>,
}

async fn execute_command(ctx: HandlerContext, params: Value) -> HandlerResult {
    let ExecuteCommandParams { command, args } = parse(params)?;
    let result = run_command(&ctx, &command, args.unwrap_or_default()).await?;
    Ok(json!({ "success": true, "command": command, "result": result }))
}

#[derive(Deserialize)]
struct ShowMessageParams {
    message: String,
    #[serde(default, rename = "type")]
    kind: MessageKind,
}

async fn show_message(ctx: HandlerContext, params: Value) -> HandlerResult {
    let ShowMessageParams { message, kind } = parse(params)?;
    ctx.editor.show_message(kind, &message).await;
    Ok(json!({ "success": true, "message": message, "type": kind }))
}

async fn get_file_content(ctx: HandlerContext, params: Value) -> HandlerResult {
    let FilePathParams { file_path } = parse(params)?;
    let doc = ctx.editor.read_document(&file_path).await?;
    Ok(json!({
        "success": true,
        "filePath": display(&file_path),
        "content": doc.text,
        "lineCount": doc.line_count,
        "language": doc.language,
    }))
}

#[derive(Deserialize)]
struct InsertTextParams {
    text: String,
    #[serde(default)]
    position: Option<Position>,
}

async fn insert_text(ctx: HandlerContext, params: Value) -> HandlerResult {
    let InsertTextParams { text, position } = parse(params)?;
    let at = ctx.editor.insert_text(&text, position).await?;
    Ok(json!({ "success": true, "text": text, "position": at }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    search_term: String,
}

async fn search_in_files(ctx: HandlerContext, params: Value) -> HandlerResult {
    let SearchParams { search_term } = parse(params)?;
    let query = json!({ "query": search_term, "triggerSearch": true });
    run_command(&ctx, commands::FIND_IN_FILES, vec![query]).await?;
    Ok(json!({
        "success": true,
        "searchTerm": search_term,
        "message": "Search started in Search panel",
    }))
}

/// Literal replacement of `needle`; returns the new text and how many
/// occurrences were replaced.
fn replace_literal(text: &str, needle: &str, replacement: &str, all: bool) -> (String, usize) {
    if all {
        (text.replace(needle, replacement), text.matches(needle).count())
    } else {
        let count = usize::from(text.contains(needle));
        (text.replacen(needle, replacement, 1), count)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceTextParams {
    old_text: String,
    new_text: String,
    #[serde(default = "default_true")]
    replace_all: bool,
}

async fn replace_text(ctx: HandlerContext, params: Value) -> HandlerResult {
    let ReplaceTextParams {
        old_text,
        new_text,
        replace_all,
    } = parse(params)?;
    if old_text.is_empty() {
        return Err(HandlerError::invalid_params("oldText must not be empty"));
    }

    let text = ctx.editor.active_text().await?;
    let (replaced, count) = replace_literal(&text, &old_text, &new_text, replace_all);
    if count > 0 {
        ctx.editor.replace_active_text(replaced).await?;
    }
    Ok(json!({
        "success": true,
        "oldText": old_text,
        "newText": new_text,
        "replaceAll": replace_all,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GotoLineParams {
    line_number: u32,
    #[serde(default = "default_column")]
    column: u32,
}

async fn goto_line(ctx: HandlerContext, params: Value) -> HandlerResult {
    let GotoLineParams {
        line_number,
        column,
    } = parse(params)?;
    let at = Position::new(
        zero_based(line_number, "lineNumber")?,
        zero_based(column, "column")?,
    );
    ctx.editor.set_selection(Range::caret(at)).await?;
    Ok(json!({ "success": true, "line": line_number, "column": column }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectTextParams {
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

async fn select_text(ctx: HandlerContext, params: Value) -> HandlerResult {
    let SelectTextParams {
        start_line,
        start_column,
        end_line,
        end_column,
    } = parse(params)?;
    let range = Range::new(
        Position::new(
            zero_based(start_line, "startLine")?,
            zero_based(start_column, "startColumn")?,
        ),
        Position::new(
            zero_based(end_line, "endLine")?,
            zero_based(end_column, "endColumn")?,
        ),
    );
    ctx.editor.set_selection(range).await?;
    Ok(json!({
        "success": true,
        "startLine": start_line,
        "startColumn": start_column,
        "endLine": end_line,
        "endColumn": end_column,
    }))
}

async fn get_selection(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let selection = ctx.editor.selection().await?;
    Ok(json!({
        "success": true,
        "text": selection.text,
        "start": WirePosition::from(selection.range.start),
        "end": WirePosition::from(selection.range.end),
        "isEmpty": selection.range.is_empty(),
    }))
}

async fn format_document(ctx: HandlerContext, _params: Value) -> HandlerResult {
    run_command(&ctx, commands::FORMAT_DOCUMENT, Vec::new()).await?;
    Ok(json!({ "success": true, "message": "Document formatted" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindAndReplaceParams {
    search_text: String,
    replace_text: String,
    #[serde(default = "default_true")]
    replace_all: bool,
}

async fn find_and_replace(ctx: HandlerContext, params: Value) -> HandlerResult {
    let FindAndReplaceParams {
        search_text,
        replace_text,
        replace_all,
    } = parse(params)?;
    if search_text.is_empty() {
        return Err(HandlerError::invalid_params("searchText must not be empty"));
    }

    let text = ctx.editor.active_text().await?;
    let (replaced, replacements) = replace_literal(&text, &search_text, &replace_text, replace_all);
    if replacements == 0 {
        return Err(HandlerError::Editor(EditorError::Other(
            "No text found to replace".to_string(),
        )));
    }
    ctx.editor.replace_active_text(replaced).await?;

    Ok(json!({
        "success": true,
        "searchText": search_text,
        "replaceText": replace_text,
        "replacements": replacements,
        "replaceAll": replace_all,
    }))
}

async fn get_diagnostics(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let (path, diagnostics) = ctx.editor.diagnostics().await?;
    let diagnostics: Vec<Value> = diagnostics
        .into_iter()
        .map(|diagnostic| {
            json!({
                "message": diagnostic.message,
                "severity": diagnostic.severity,
                "range": {
                    "start": WirePosition::from(diagnostic.range.start),
                    "end": WirePosition::from(diagnostic.range.end),
                },
                "source": diagnostic.source.as_deref().unwrap_or("Unknown"),
            })
        })
        .collect();
    Ok(json!({
        "success": true,
        "count": diagnostics.len(),
        "diagnostics": diagnostics,
        "file": display(&path),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunTaskParams {
    task_name: String,
}

async fn run_task(ctx: HandlerContext, params: Value) -> HandlerResult {
    let RunTaskParams { task_name } = parse(params)?;
    ctx.until_cancelled(ctx.editor.run_task(&task_name))
        .await??;
    Ok(json!({ "success": true, "taskName": task_name, "message": "Task started" }))
}

#[derive(Deserialize)]
struct OpenTerminalParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

async fn open_terminal(ctx: HandlerContext, params: Value) -> HandlerResult {
    let OpenTerminalParams { name, cwd } = parse(params)?;
    let name = name.as_deref().unwrap_or(DEFAULT_TERMINAL_NAME);
    let name = ctx.editor.open_terminal(name, cwd.as_deref()).await?;
    Ok(json!({ "success": true, "name": name, "message": "Terminal opened" }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTerminalParams {
    command: String,
    #[serde(default)]
    terminal_name: Option<String>,
}

async fn send_terminal_command(ctx: HandlerContext, params: Value) -> HandlerResult {
    let SendTerminalParams {
        command,
        terminal_name,
    } = parse(params)?;
    let terminal = ctx
        .editor
        .send_terminal_text(&command, terminal_name.as_deref())
        .await?;
    Ok(json!({
        "success": true,
        "command": command,
        "terminal": terminal,
        "message": "Command sent to terminal",
    }))
}

async fn get_extensions(ctx: HandlerContext, _params: Value) -> HandlerResult {
    let extensions: Vec<Value> = ctx
        .editor
        .extensions()
        .await
        .into_iter()
        .map(|ext| {
            json!({
                "id": ext.id,
                "displayName": ext.display_name,
                "version": ext.version,
                "isActive": ext.is_active,
                "description": ext.description,
            })
        })
        .collect();
    Ok(json!({
        "success": true,
        "count": extensions.len(),
        "extensions": extensions,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallExtensionParams {
    extension_id: String,
}

async fn install_extension(ctx: HandlerContext, params: Value) -> HandlerResult {
    let InstallExtensionParams { extension_id } = parse(params)?;
    ctx.until_cancelled(ctx.editor.install_extension(&extension_id))
        .await??;
    Ok(json!({
        "success": true,
        "message": format!("Extension {extension_id} has been installed"),
        "extensionId": extension_id,
    }))
}

async fn get_themes(ctx: HandlerContext, _params: Value) -> HandlerResult {
    Ok(json!({
        "success": true,
        "themes": BUILT_IN_THEMES,
        "count": BUILT_IN_THEMES.len(),
        "current": ctx.editor.theme().await,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeThemeParams {
    theme_name: String,
}

async fn change_theme(ctx: HandlerContext, params: Value) -> HandlerResult {
    let ChangeThemeParams { theme_name } = parse(params)?;
    ctx.editor.set_theme(&theme_name).await?;
    Ok(json!({
        "success": true,
        "message": format!("Theme changed to: {theme_name}"),
        "themeName": theme_name,
    }))
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SplitDirection {
    Horizontal,
    #[default]
    Vertical,
}

#[derive(Deserialize)]
struct SplitEditorParams {
    #[serde(default)]
    direction: SplitDirection,
}

async fn split_editor(ctx: HandlerContext, params: Value) -> HandlerResult {
    let SplitEditorParams { direction } = parse(params)?;
    let (command, message) = match direction {
        SplitDirection::Horizontal => (commands::SPLIT_EDITOR_DOWN, "Editor split horizontally"),
        SplitDirection::Vertical => (commands::SPLIT_EDITOR, "Editor split vertically"),
    };
    run_command(&ctx, command, Vec::new()).await?;
    Ok(json!({ "success": true, "direction": direction, "message": message }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseAllTabsParams {
    #[serde(default = "default_true")]
    save_all: bool,
}

async fn close_all_tabs(ctx: HandlerContext, params: Value) -> HandlerResult {
    let CloseAllTabsParams { save_all } = parse(params)?;
    if save_all {
        run_command(&ctx, commands::SAVE_ALL, Vec::new()).await?;
    }
    run_command(&ctx, commands::CLOSE_ALL_EDITORS, Vec::new()).await?;
    Ok(json!({ "success": true, "saveAll": save_all, "message": "All tabs closed" }))
}
