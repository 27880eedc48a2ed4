//! Tool registry: discovery and dispatch for the sandbox tool set.

use std::collections::HashMap;

use crate::mcp::types::ToolDescriptor;
use crate::tools::analyze::AnalyzeFunctionsTool;
use crate::tools::cmd::ExecuteCommandTool;
use crate::tools::fs::{ListFilesTool, ReadFileTool, ReadLinesTool, TailTool, WriteFileTool};
use crate::tools::jsonq::ParseJsonTool;
use crate::tools::search::GrepTool;
use crate::tools::types::{Tool, ToolContext, ToolError};

/// Registry of all sandbox tools, sharing one [`ToolContext`].
pub struct ToolRegistry {
    context: ToolContext,
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates a registry with the full tool set registered.
    pub fn new(context: ToolContext) -> Self {
        let mut tools: HashMap<String, Box<dyn Tool>> = HashMap::new();

        tools.insert("listFiles".to_string(), Box::new(ListFilesTool));
        tools.insert("readFile".to_string(), Box::new(ReadFileTool));
        tools.insert("writeFile".to_string(), Box::new(WriteFileTool));
        tools.insert("readLines".to_string(), Box::new(ReadLinesTool));
        tools.insert("tail".to_string(), Box::new(TailTool));
        tools.insert("grep".to_string(), Box::new(GrepTool));
        tools.insert(
            "executeCommand".to_string(),
            Box::new(ExecuteCommandTool::new()),
        );
        tools.insert("parseJson".to_string(), Box::new(ParseJsonTool));
        tools.insert("analyzeFunctions".to_string(), Box::new(AnalyzeFunctionsTool));

        Self { context, tools }
    }

    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Descriptors for every registered tool, sorted by name.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Invoke a tool by name with the given arguments.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(&self.context, args).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry")
            .field("tools", &names)
            .field("context", &self.context)
            .finish()
    }
}
