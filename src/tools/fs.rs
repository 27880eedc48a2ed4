//! Filesystem tools: list, read, write, line ranges, tail.
//!
//! These are thin wrappers around filesystem calls. I/O failures are
//! reported inside the result payload (so the agent can see and react to
//! them); only malformed arguments surface as [`ToolError`].

use async_trait::async_trait;
use serde_json::json;

use crate::mcp::types::ToolDescriptor;
use crate::tools::types::{require_str, require_u64, Tool, ToolContext, ToolError};

/// Tool listing the entries of a directory.
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "listFiles".into(),
            description:
                "List files and directories in a given path. Use \"/\" for current directory."
                    .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Directory path to list (e.g., \"/\" or \"/src\")" }
                },
                "required": ["path"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let actual = ctx.resolve(path);

        let mut dir = match tokio::fs::read_dir(&actual).await {
            Ok(dir) => dir,
            Err(e) => {
                return Ok(json!({ "error": e.to_string(), "files": [], "count": 0 }));
            }
        };

        let mut files = Vec::new();
        while let Ok(Some(entry)) = dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let entry_path = if path == "/" || path.is_empty() {
                format!("/{name}")
            } else {
                format!("{}/{name}", path.trim_end_matches('/'))
            };
            files.push(json!({
                "name": name,
                "type": if is_dir { "directory" } else { "file" },
                "path": entry_path,
            }));
        }
        files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": path,
            "absolutePath": actual.to_string_lossy(),
            "files": files,
            "count": files.len(),
        }))
    }
}

/// Tool reading a complete file.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "readFile".into(),
            description: concat!(
                "Read the complete contents of a file. ",
                "For large files, consider using readLines or tail instead."
            )
            .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path to read" }
                },
                "required": ["path"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let actual = ctx.resolve(path);

        match tokio::fs::read_to_string(&actual).await {
            Ok(content) => Ok(json!({
                "path": path,
                "absolutePath": actual.to_string_lossy(),
                "size": content.len(),
                "lines": content.lines().count(),
                "content": content,
            })),
            Err(e) => Ok(json!({ "error": e.to_string(), "content": "", "size": 0 })),
        }
    }
}

/// Tool writing content to a file, creating parent directories as needed.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "writeFile".into(),
            description: "Write content to a file. Creates the file if it does not exist.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path to write to" },
                    "content": { "type": "string", "description": "Content to write to the file" }
                },
                "required": ["path", "content"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let content = require_str(&args, "content")?;
        let actual = ctx.resolve(path);

        if let Some(parent) = actual.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(json!({ "success": false, "error": e.to_string() }));
            }
        }

        match tokio::fs::write(&actual, content).await {
            Ok(()) => Ok(json!({
                "success": true,
                "path": path,
                "absolutePath": actual.to_string_lossy(),
                "size": content.len(),
                "message": "File written successfully",
            })),
            Err(e) => Ok(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

/// Tool reading a specific 1-based line range from a file.
pub struct ReadLinesTool;

#[async_trait]
impl Tool for ReadLinesTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "readLines".into(),
            description:
                "Read specific line range from a file. Useful for reading sections of large files."
                    .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path to read" },
                    "start": { "type": "number", "description": "Start line number (1-based)" },
                    "end": { "type": "number", "description": "End line number (1-based)" }
                },
                "required": ["path", "start", "end"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let start = require_u64(&args, "start")? as usize;
        let end = require_u64(&args, "end")? as usize;
        if start == 0 || end < start {
            return Err(ToolError::InvalidInput(
                "start and end must form a 1-based range".into(),
            ));
        }
        let actual = ctx.resolve(path);

        let content = match tokio::fs::read_to_string(&actual).await {
            Ok(content) => content,
            Err(e) => return Ok(json!({ "error": e.to_string(), "content": "" })),
        };

        let selected: Vec<&str> = content
            .lines()
            .skip(start - 1)
            .take(end - start + 1)
            .collect();

        Ok(json!({
            "path": path,
            "absolutePath": actual.to_string_lossy(),
            "start": start,
            "end": end,
            "lineCount": selected.len(),
            "content": selected.join("\n"),
        }))
    }
}

const TAIL_DEFAULT_LINES: usize = 20;

/// Tool reading the last N lines of a file.
pub struct TailTool;

#[async_trait]
impl Tool for TailTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "tail".into(),
            description: "Read the last N lines of a file. Useful for checking recent output."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "File path to read" },
                    "lines": { "type": "number", "description": "Number of lines to read (default: 20)" }
                },
                "required": ["path"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let requested = args
            .get("lines")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(TAIL_DEFAULT_LINES);
        let actual = ctx.resolve(path);

        let content = match tokio::fs::read_to_string(&actual).await {
            Ok(content) => content,
            Err(e) => return Ok(json!({ "error": e.to_string(), "content": "" })),
        };

        let all: Vec<&str> = content.lines().collect();
        let tail_start = all.len().saturating_sub(requested);
        let selected = &all[tail_start..];

        Ok(json!({
            "path": path,
            "absolutePath": actual.to_string_lossy(),
            "requestedLines": requested,
            "actualLines": selected.len(),
            "content": selected.join("\n"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(dir: &tempfile::TempDir) -> ToolContext {
        ToolContext::with_capabilities(dir.path(), false)
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(&dir);

        let written = WriteFileTool
            .invoke(&ctx, json!({ "path": "/notes/todo.txt", "content": "a\nb\nc" }))
            .await
            .unwrap();
        assert_eq!(written["success"], true);

        let read = ReadFileTool
            .invoke(&ctx, json!({ "path": "/notes/todo.txt" }))
            .await
            .unwrap();
        assert_eq!(read["content"], "a\nb\nc");
        assert_eq!(read["lines"], 3);
    }

    #[tokio::test]
    async fn test_read_missing_file_reports_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReadFileTool
            .invoke(&ctx(&dir), json!({ "path": "/nope.txt" }))
            .await
            .unwrap();
        assert!(result["error"].as_str().is_some());
        assert_eq!(result["content"], "");
    }

    #[tokio::test]
    async fn test_list_files_shape() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(&dir);
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();

        let result = ListFilesTool
            .invoke(&ctx, json!({ "path": "/" }))
            .await
            .unwrap();
        assert_eq!(result["count"], 2);

        let files = result["files"].as_array().unwrap();
        assert_eq!(files[0]["name"], "README.md");
        assert_eq!(files[0]["type"], "file");
        assert_eq!(files[0]["path"], "/README.md");
        assert_eq!(files[1]["name"], "src");
        assert_eq!(files[1]["type"], "directory");
    }

    #[tokio::test]
    async fn test_read_lines_range() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(&dir);
        std::fs::write(dir.path().join("f.txt"), "1\n2\n3\n4\n5").unwrap();

        let result = ReadLinesTool
            .invoke(&ctx, json!({ "path": "/f.txt", "start": 2, "end": 4 }))
            .await
            .unwrap();
        assert_eq!(result["content"], "2\n3\n4");
        assert_eq!(result["lineCount"], 3);

        // Range past EOF is clamped, not an error.
        let result = ReadLinesTool
            .invoke(&ctx, json!({ "path": "/f.txt", "start": 4, "end": 99 }))
            .await
            .unwrap();
        assert_eq!(result["content"], "4\n5");
    }

    #[tokio::test]
    async fn test_read_lines_rejects_bad_range() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadLinesTool
            .invoke(&ctx(&dir), json!({ "path": "/f.txt", "start": 3, "end": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_tail_defaults_and_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(&dir);
        let body: Vec<String> = (1..=30).map(|i| i.to_string()).collect();
        std::fs::write(dir.path().join("log.txt"), body.join("\n")).unwrap();

        let result = TailTool
            .invoke(&ctx, json!({ "path": "/log.txt" }))
            .await
            .unwrap();
        assert_eq!(result["requestedLines"], 20);
        assert_eq!(result["actualLines"], 20);
        assert!(result["content"].as_str().unwrap().starts_with("11"));

        let result = TailTool
            .invoke(&ctx, json!({ "path": "/log.txt", "lines": 100 }))
            .await
            .unwrap();
        assert_eq!(result["actualLines"], 30);
    }
}
