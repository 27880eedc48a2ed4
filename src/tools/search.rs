//! Search tool: grep over workspace files.

use async_trait::async_trait;
use serde_json::json;

use crate::mcp::types::ToolDescriptor;
use crate::tools::types::{require_str, Tool, ToolContext, ToolError};

/// Matches listed inline before the summary switches to a count.
const SUMMARY_LINES: usize = 20;

/// Tool searching for patterns with grep.
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "grep".into(),
            description: "Search for patterns in files using grep. Useful for finding specific content.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "description": "Pattern to search for" },
                    "path": { "type": "string", "description": "File or directory to search in" },
                    "caseInsensitive": { "type": "boolean", "description": "Case insensitive search (default: false)" },
                    "lineNumbers": { "type": "boolean", "description": "Show line numbers (default: true)" }
                },
                "required": ["pattern", "path"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let pattern = require_str(&args, "pattern")?;
        let path = require_str(&args, "path")?;
        let case_insensitive = args
            .get("caseInsensitive")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let line_numbers = args
            .get("lineNumbers")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        let actual = ctx.resolve(path);

        let mut command = tokio::process::Command::new("grep");
        command.arg("-r");
        if case_insensitive {
            command.arg("-i");
        }
        if line_numbers {
            command.arg("-n");
        }
        command.arg("--").arg(pattern).arg(&actual);

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                return Ok(json!({ "error": e.to_string(), "matches": 0, "results": [] }));
            }
        };

        // Exit code 1 means "no matches", which is a valid empty result;
        // anything above that is a real grep failure.
        if output.status.code().map(|c| c > 1).unwrap_or(true) {
            return Ok(json!({
                "error": String::from_utf8_lossy(&output.stderr).trim(),
                "matches": 0,
                "results": [],
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();

        let summary = if lines.len() > SUMMARY_LINES {
            format!(
                "Found {} matches. Showing first {SUMMARY_LINES}:\n{}",
                lines.len(),
                lines[..SUMMARY_LINES].join("\n")
            )
        } else {
            stdout.clone()
        };

        Ok(json!({
            "pattern": pattern,
            "path": path,
            "matches": lines.len(),
            "results": lines,
            "summary": summary,
        }))
    }
}
