//! JSON query tool backed by jq.
//!
//! jq availability is a capability of the [`ToolContext`], probed once when
//! the registry is built. When jq is missing the tool reports it in the
//! result payload; no installation is attempted at call time.

use async_trait::async_trait;
use serde_json::json;

use crate::mcp::types::ToolDescriptor;
use crate::tools::types::{require_str, Tool, ToolContext, ToolError};

/// Tool querying JSON files with jq expressions.
pub struct ParseJsonTool;

#[async_trait]
impl Tool for ParseJsonTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "parseJson".into(),
            description:
                "Parse and query JSON files using jq. Useful for extracting specific data from JSON."
                    .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "JSON file path" },
                    "query": { "type": "string", "description": "jq query (e.g., \".users[0].name\" or \".\")" }
                },
                "required": ["path", "query"]
            }),
        }
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let path = require_str(&args, "path")?;
        let query = require_str(&args, "query")?;

        if !ctx.jq_available() {
            return Ok(json!({
                "error": "jq is not available in this sandbox",
                "result": null,
            }));
        }

        let actual = ctx.resolve(path);

        // Query and path are passed as separate arguments; nothing is
        // interpolated through a shell.
        let output = match tokio::process::Command::new("jq")
            .arg(query)
            .arg(&actual)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return Ok(json!({ "error": e.to_string(), "result": null })),
        };

        if !output.status.success() {
            return Ok(json!({
                "error": String::from_utf8_lossy(&output.stderr).trim(),
                "result": null,
            }));
        }

        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let result: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(_) => json!(raw),
        };

        Ok(json!({
            "path": path,
            "query": query,
            "result": result,
            "raw": raw,
        }))
    }
}
