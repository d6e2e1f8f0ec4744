//! Local filesystem tools. These run in the MCP process, not in the editor.

use anyhow::{Context, Result};

/// Text of `path`, prefixed with a header naming it.
pub async fn read_file(path: &str) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read file {path}"))?;
    Ok(format!("Content of {path}:\n\n{content}"))
}

/// One `<kind>: <name>` line per directory entry, sorted by name.
pub async fn list_files(directory: &str) -> Result<String> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .with_context(|| format!("Cannot read directory {directory}"))?;

    let mut listing = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Cannot read directory {directory}"))?
    {
        let kind = match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => "directory",
            _ => "file",
        };
        listing.push((entry.file_name().to_string_lossy().into_owned(), kind));
    }
    listing.sort();

    let lines: Vec<String> = listing
        .iter()
        .map(|(name, kind)| format!("{kind}: {name}"))
        .collect();
    Ok(format!("Files in {directory}:\n\n{}", lines.join("\n")))
}

/// `directoryPath` argument, defaulting to the working directory.
pub(crate) fn directory_argument(arguments: &serde_json::Value) -> &str {
    arguments
        .get("directoryPath")
        .and_then(serde_json::Value::as_str)
        .filter(|dir| !dir.is_empty())
        .unwrap_or(".")
}

/// `filePath` argument, which must be a non-empty string.
pub(crate) fn file_argument(arguments: &serde_json::Value) -> Result<&str> {
    arguments
        .get("filePath")
        .and_then(serde_json::Value::as_str)
        .filter(|path| !path.is_empty())
        .context("filePath must be a non-empty string")
}
