//! Tool catalog: names, descriptions and input schemas.
//!
//! Every `vscode_*` tool forwards to exactly one bridge method. `read_file`
//! and `list_files` run locally and never touch the bridge.

use rmcp::model::{JsonObject, Tool};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

/// Where a tool call is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolTarget {
    /// Forward to this bridge method
    Method(&'static str),
    /// Read a local file
    ReadFile,
    /// List a local directory
    ListFiles,
}

/// One entry of the catalog
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub target: ToolTarget,
    pub input_schema: Arc<JsonObject>,
}

impl ToolSpec {
    /// The MCP tool definition advertised in `tools/list`.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: Cow::Borrowed(self.name),
            description: Some(Cow::Borrowed(self.description)),
            input_schema: Arc::clone(&self.input_schema),
            output_schema: None,
            annotations: None,
            title: None,
            icons: None,
        }
    }

    /// Bridge method this tool forwards to, if any.
    pub fn method(&self) -> Option<&'static str> {
        match self.target {
            ToolTarget::Method(method) => Some(method),
            ToolTarget::ReadFile | ToolTarget::ListFiles => None,
        }
    }
}

static CATALOG: LazyLock<Vec<ToolSpec>> = LazyLock::new(build);

/// All tools, in the order they are advertised.
pub fn catalog() -> &'static [ToolSpec] {
    &CATALOG
}

/// Look a tool up by name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

fn schema(properties: Value, required: &[&str]) -> Arc<JsonObject> {
    let mut object = Map::new();
    object.insert("type".to_string(), json!("object"));
    object.insert("properties".to_string(), properties);
    if !required.is_empty() {
        object.insert("required".to_string(), json!(required));
    }
    Arc::new(object)
}

fn method(
    name: &'static str,
    method: &'static str,
    description: &'static str,
    properties: Value,
    required: &[&str],
) -> ToolSpec {
    ToolSpec {
        name,
        description,
        target: ToolTarget::Method(method),
        input_schema: schema(properties, required),
    }
}

fn no_args(name: &'static str, target: &'static str, description: &'static str) -> ToolSpec {
    method(name, target, description, json!({}), &[])
}

fn build() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "read_file",
            description: "Read a file from the local filesystem",
            target: ToolTarget::ReadFile,
            input_schema: schema(
                json!({ "filePath": { "type": "string", "description": "Path to file to read" } }),
                &["filePath"],
            ),
        },
        ToolSpec {
            name: "list_files",
            description: "List files in a local directory",
            target: ToolTarget::ListFiles,
            input_schema: schema(
                json!({
                    "directoryPath": {
                        "type": "string",
                        "description": "Directory path",
                        "default": ".",
                    }
                }),
                &[],
            ),
        },
        no_args(
            "vscode_get_workspace_info",
            "getWorkspaceInfo",
            "Get the editor's workspace folders and active file",
        ),
        no_args("vscode_get_open_tabs", "getOpenTabs", "List the tabs open in the editor"),
        no_args(
            "vscode_get_active_editor",
            "getActiveEditor",
            "Get the active file, its language, line count and cursor",
        ),
        method(
            "vscode_open_file",
            "openFile",
            "Open a file in the editor",
            json!({ "filePath": { "type": "string", "description": "Path to file to open" } }),
            &["filePath"],
        ),
        method(
            "vscode_create_file",
            "createFile",
            "Create a file with content and open it in the editor",
            json!({
                "filePath": { "type": "string", "description": "Path to new file" },
                "content": { "type": "string", "description": "File content", "default": "" },
            }),
            &["filePath"],
        ),
        no_args("vscode_save_file", "saveFile", "Save the active file"),
        method(
            "vscode_close_file",
            "closeFile",
            "Close a file, or the active file when no path is given",
            json!({
                "filePath": { "type": "string", "description": "Path to file to close (optional)" }
            }),
            &[],
        ),
        method(
            "vscode_get_file_content",
            "getFileContent",
            "Get a file's content as the editor sees it",
            json!({ "filePath": { "type": "string", "description": "Path to file" } }),
            &["filePath"],
        ),
        method(
            "vscode_insert_text",
            "insertText",
            "Insert text in the active editor, at the cursor or at a position",
            json!({
                "text": { "type": "string", "description": "Text to insert" },
                "line": { "type": "number", "description": "Line number, 0-based (optional)" },
                "character": {
                    "type": "number",
                    "description": "Character position, 0-based (optional)",
                },
            }),
            &["text"],
        ),
        method(
            "vscode_replace_text",
            "replaceText",
            "Replace literal text in the active file",
            json!({
                "oldText": { "type": "string", "description": "Old text" },
                "newText": { "type": "string", "description": "New text" },
                "replaceAll": {
                    "type": "boolean",
                    "description": "Replace all occurrences",
                    "default": true,
                },
            }),
            &["oldText", "newText"],
        ),
        method(
            "vscode_find_and_replace",
            "findAndReplace",
            "Find and replace text in the active file, reporting how many matches changed",
            json!({
                "searchText": { "type": "string", "description": "Search text" },
                "replaceText": { "type": "string", "description": "Replacement text" },
                "replaceAll": {
                    "type": "boolean",
                    "description": "Replace all occurrences",
                    "default": true,
                },
            }),
            &["searchText", "replaceText"],
        ),
        method(
            "vscode_goto_line",
            "gotoLine",
            "Move the cursor to a line in the active editor",
            json!({
                "lineNumber": { "type": "number", "description": "Line number (starting from 1)" },
                "column": {
                    "type": "number",
                    "description": "Column number (optional)",
                    "default": 1,
                },
            }),
            &["lineNumber"],
        ),
        method(
            "vscode_select_text",
            "selectText",
            "Select a range in the active editor (1-based lines and columns)",
            json!({
                "startLine": { "type": "number", "description": "Start line" },
                "startColumn": { "type": "number", "description": "Start column" },
                "endLine": { "type": "number", "description": "End line" },
                "endColumn": { "type": "number", "description": "End column" },
            }),
            &["startLine", "startColumn", "endLine", "endColumn"],
        ),
        no_args(
            "vscode_get_selection",
            "getSelection",
            "Get the selected text in the active editor",
        ),
        no_args("vscode_format_document", "formatDocument", "Format the active document"),
        no_args(
            "vscode_get_diagnostics",
            "getDiagnostics",
            "Get errors and warnings for the active file",
        ),
        method(
            "vscode_search_in_files",
            "searchInFiles",
            "Start a search across the workspace",
            json!({ "searchTerm": { "type": "string", "description": "Text to search" } }),
            &["searchTerm"],
        ),
        method(
            "vscode_execute_command",
            "executeCommand",
            "Execute an editor command by identifier",
            json!({
                "command": { "type": "string", "description": "Command to execute" },
                "args": { "type": "array", "description": "Command arguments (optional)" },
            }),
            &["command"],
        ),
        method(
            "vscode_show_message",
            "showMessage",
            "Show a notification in the editor",
            json!({
                "message": { "type": "string", "description": "Message to display" },
                "type": {
                    "type": "string",
                    "enum": ["info", "warning", "error"],
                    "description": "Message type",
                    "default": "info",
                },
            }),
            &["message"],
        ),
        method(
            "vscode_run_task",
            "runTask",
            "Run a task defined in the workspace",
            json!({ "taskName": { "type": "string", "description": "Task name" } }),
            &["taskName"],
        ),
        method(
            "vscode_open_terminal",
            "openTerminal",
            "Open a terminal in the editor",
            json!({
                "name": { "type": "string", "description": "Terminal name (optional)" },
                "cwd": { "type": "string", "description": "Working directory (optional)" },
            }),
            &[],
        ),
        method(
            "vscode_send_terminal_command",
            "sendTerminalCommand",
            "Send a command line to a terminal",
            json!({
                "command": { "type": "string", "description": "Command to execute" },
                "terminalName": { "type": "string", "description": "Terminal name (optional)" },
            }),
            &["command"],
        ),
        no_args(
            "vscode_get_extensions",
            "getExtensions",
            "List the installed editor extensions",
        ),
        method(
            "vscode_install_extension",
            "installExtension",
            "Install an editor extension",
            json!({ "extensionId": { "type": "string", "description": "Extension ID to install" } }),
            &["extensionId"],
        ),
        no_args("vscode_get_themes", "getThemes", "List the available color themes"),
        method(
            "vscode_change_theme",
            "changeTheme",
            "Change the editor color theme",
            json!({ "themeName": { "type": "string", "description": "Theme name" } }),
            &["themeName"],
        ),
        method(
            "vscode_split_editor",
            "splitEditor",
            "Split the editor",
            json!({
                "direction": {
                    "type": "string",
                    "enum": ["horizontal", "vertical"],
                    "description": "Split direction",
                    "default": "vertical",
                }
            }),
            &[],
        ),
        method(
            "vscode_close_all_tabs",
            "closeAllTabs",
            "Close every tab, saving first by default",
            json!({
                "saveAll": {
                    "type": "boolean",
                    "description": "Save all files before closing",
                    "default": true,
                }
            }),
            &[],
        ),
    ]
}

/// Turn tool arguments into bridge method params.
///
/// Arguments pass through unchanged, except that `vscode_insert_text` takes
/// `line` and `character` as separate arguments and the method expects them
/// as `position`. A position is only sent when both are present.
pub fn method_params(tool: &str, arguments: Option<JsonObject>) -> Value {
    let mut arguments = arguments.unwrap_or_default();

    if tool == "vscode_insert_text" {
        let line = arguments.remove("line");
        let character = arguments.remove("character");
        if let (Some(line), Some(character)) = (line, character) {
            arguments.insert(
                "position".to_string(),
                json!({ "line": line, "character": character }),
            );
        }
    }

    Value::Object(arguments)
}
