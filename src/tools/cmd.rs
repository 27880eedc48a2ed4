//! Shell command execution with output redirection.
//!
//! Command output is redirected to files under the workspace `outputs/`
//! directory so large outputs never flood the agent's context; the result
//! carries the file paths, line counts, and a short preview. Execution is
//! bounded by a wall-clock cap (expiry yields a synthetic failure outcome,
//! the session never hangs on a runaway command) and an output-size cap
//! (excess is truncated, not fatal).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::mcp::types::ToolDescriptor;
use crate::tools::types::{require_str, Tool, ToolContext, ToolError};

/// Wall-clock cap for one command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured-output cap per stream.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Synthetic exit code reported when the wall-clock cap expires.
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Lines shown in the inline preview before pointing at the output files.
const PREVIEW_LINES: usize = 10;

/// Tool executing a shell command inside the workspace.
pub struct ExecuteCommandTool {
    timeout: Duration,
    max_output: usize,
}

impl ExecuteCommandTool {
    pub fn new() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
            max_output: MAX_OUTPUT_BYTES,
        }
    }

    /// Override the caps (used by tests).
    pub fn with_limits(timeout: Duration, max_output: usize) -> Self {
        Self {
            timeout,
            max_output,
        }
    }
}

impl Default for ExecuteCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "executeCommand".into(),
            description: concat!(
                "Execute a shell command. Output is redirected to files to keep context clean. ",
                "Returns file paths and summary."
            )
            .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "Shell command to execute" },
                    "workingDir": { "type": "string", "description": "Working directory (optional, defaults to workspace root)" }
                },
                "required": ["command"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let command = require_str(&args, "command")?;
        let working_dir = match args.get("workingDir").and_then(|v| v.as_str()) {
            Some(dir) => ctx.resolve(dir),
            None => ctx.workspace_root().to_path_buf(),
        };

        tokio::fs::create_dir_all(ctx.outputs_dir())
            .await
            .map_err(|e| ToolError::Execution(format!("failed to create outputs dir: {e}")))?;

        debug!("executing `{command}` in {}", working_dir.display());

        let timestamp = chrono::Utc::now().timestamp_millis();
        let stdout_file = ctx.outputs_dir().join(format!("cmd-{timestamp}-stdout.txt"));
        let stderr_file = ctx.outputs_dir().join(format!("cmd-{timestamp}-stderr.txt"));

        let (exit_code, stdout, stderr, timed_out) = self.run(command, &working_dir).await;

        let (stdout, stdout_truncated) = truncate_output(stdout, self.max_output);
        let (stderr, stderr_truncated) = truncate_output(stderr, self.max_output);

        tokio::fs::write(&stdout_file, &stdout)
            .await
            .map_err(|e| ToolError::Execution(format!("failed to write stdout file: {e}")))?;
        tokio::fs::write(&stderr_file, &stderr)
            .await
            .map_err(|e| ToolError::Execution(format!("failed to write stderr file: {e}")))?;

        let stdout_lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
        let stderr_lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();

        let message = if timed_out {
            format!("Command timed out after {:?}", self.timeout)
        } else if exit_code == 0 {
            "Command executed successfully".to_string()
        } else {
            "Command failed with errors".to_string()
        };

        Ok(json!({
            "success": exit_code == 0,
            "exitCode": exit_code,
            "command": command,
            "workingDir": working_dir.to_string_lossy(),
            "outputFiles": {
                "stdout": ctx.relativize(&stdout_file),
                "stderr": ctx.relativize(&stderr_file),
            },
            "summary": {
                "stdoutLines": stdout_lines.len(),
                "stderrLines": stderr_lines.len(),
                "stdoutPreview": preview(&stdout_lines, &stdout),
                "stderrPreview": preview(&stderr_lines, &stderr),
                "truncated": stdout_truncated || stderr_truncated,
            },
            "message": message,
        }))
    }
}

impl ExecuteCommandTool {
    /// Run the command, folding every failure mode into an outcome tuple.
    async fn run(&self, command: &str, working_dir: &PathBuf) -> (i32, String, String, bool) {
        let mut child = tokio::process::Command::new("sh");
        child
            .args(["-lc", command])
            .current_dir(working_dir)
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, child.output()).await {
            Ok(Ok(output)) => (
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
                false,
            ),
            Ok(Err(e)) => (1, String::new(), e.to_string(), false),
            Err(_) => (
                TIMEOUT_EXIT_CODE,
                String::new(),
                format!("command timed out after {:?}", self.timeout),
                true,
            ),
        }
    }
}

fn truncate_output(mut output: String, max_bytes: usize) -> (String, bool) {
    if output.len() <= max_bytes {
        return (output, false);
    }

    // Cut on a char boundary at or below the cap.
    let mut cut = max_bytes;
    while cut > 0 && !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str("\n... (truncated)");
    (output, true)
}

fn preview(non_empty_lines: &[&str], full: &str) -> String {
    if non_empty_lines.len() > PREVIEW_LINES {
        let mut out = non_empty_lines[..PREVIEW_LINES].join("\n");
        out.push_str("\n... (truncated)");
        out
    } else {
        full.to_string()
    }
}
