//! TypeScript function analysis.
//!
//! Extracts function declarations and arrow-function consts from a
//! TypeScript source file: name, parameters, return type, export/async
//! flags, and the preceding doc comment. A line-oriented scan is enough for
//! the "understand this file without reading all of it" use case; it does
//! not attempt to be a full parser.

use async_trait::async_trait;
use serde_json::json;

use crate::mcp::types::ToolDescriptor;
use crate::tools::types::{require_str, Tool, ToolContext, ToolError};

/// Tool extracting function signatures from a TypeScript file.
pub struct AnalyzeFunctionsTool;

#[async_trait]
impl Tool for AnalyzeFunctionsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "analyzeFunctions".into(),
            description: concat!(
                "Analyze a TypeScript file to extract function definitions, parameters, ",
                "return types, and documentation. Much faster than reading the full file."
            )
            .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "TypeScript file path to analyze" }
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

        let source = match tokio::fs::read_to_string(&actual).await {
            Ok(source) => source,
            Err(e) => {
                return Ok(json!({ "error": e.to_string(), "functions": [], "count": 0 }));
            }
        };

        let functions = extract_functions(&source);

        Ok(json!({
            "path": path,
            "absolutePath": actual.to_string_lossy(),
            "count": functions.len(),
            "functions": functions,
        }))
    }
}

#[derive(Debug)]
struct ParamInfo {
    name: String,
    type_name: String,
    optional: bool,
}

fn extract_functions(source: &str) -> Vec<serde_json::Value> {
    let lines: Vec<&str> = source.lines().collect();
    let mut functions = Vec::new();
    let mut doc: Option<String> = None;
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();

        if trimmed.starts_with("/**") {
            let (description, next) = collect_doc_comment(&lines, i);
            doc = description;
            i = next;
            continue;
        }

        // Join continuation lines until the parameter list closes, so
        // multi-line signatures are analyzed as one unit.
        if let Some(header) = signature_start(trimmed) {
            let mut joined = header.to_string();
            let mut j = i;
            while paren_balance(&joined) > 0 && j + 1 < lines.len() {
                j += 1;
                joined.push(' ');
                joined.push_str(lines[j].trim());
            }

            if let Some(function) = parse_signature(&joined, doc.take()) {
                functions.push(function);
            }
            i = j + 1;
            continue;
        }

        if !trimmed.is_empty() && !trimmed.starts_with("//") {
            doc = None;
        }
        i += 1;
    }

    functions
}

/// Returns the line if it begins a function declaration or an
/// arrow-function binding.
fn signature_start(line: &str) -> Option<&str> {
    let without_export = line.strip_prefix("export ").unwrap_or(line);
    let without_async = without_export.strip_prefix("async ").unwrap_or(without_export);

    if without_async.starts_with("function ") {
        return Some(line);
    }

    for keyword in ["const ", "let ", "var "] {
        if let Some(rest) = without_export.strip_prefix(keyword) {
            // Only bindings whose initializer is (or starts) an arrow
            // function are of interest.
            if rest.contains("=>") || rest.trim_end().ends_with('(') || rest.contains("= (")
                || rest.contains("= async")
            {
                return Some(line);
            }
        }
    }

    None
}

fn parse_signature(joined: &str, doc: Option<String>) -> Option<serde_json::Value> {
    let is_exported = joined.trim_start().starts_with("export ");
    let body = joined.trim_start().strip_prefix("export ").unwrap_or(joined.trim_start());

    let (name, params_raw, return_type, is_async) =
        if let Some(rest) = body.strip_prefix("async function ") {
            let (name, params, ret) = split_declaration(rest)?;
            (name, params, ret, true)
        } else if let Some(rest) = body.strip_prefix("function ") {
            let (name, params, ret) = split_declaration(rest)?;
            (name, params, ret, false)
        } else {
            parse_arrow_binding(body)?
        };

    let parameters = parse_params(&params_raw);
    let signature = render_signature(&name, &parameters, &return_type, is_exported, is_async);

    Some(json!({
        "name": name,
        "description": doc,
        "parameters": parameters
            .iter()
            .map(|p| json!({
                "name": p.name,
                "type": p.type_name,
                "optional": p.optional,
            }))
            .collect::<Vec<_>>(),
        "returnType": return_type,
        "isExported": is_exported,
        "isAsync": is_async,
        "signature": signature,
    }))
}

/// Split `name(params): ret {` into its parts.
fn split_declaration(rest: &str) -> Option<(String, String, String)> {
    let open = rest.find('(')?;
    let name = rest[..open].trim().to_string();
    if name.is_empty() {
        return None;
    }

    let close = matching_paren(rest, open)?;
    let params = rest[open + 1..close].to_string();

    let after = rest[close + 1..].trim();
    let return_type = after
        .strip_prefix(':')
        .map(|r| r.split(['{', '=']).next().unwrap_or("").trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    Some((name, params, return_type))
}

/// Parse `const name = async (params): ret => ...` bindings.
fn parse_arrow_binding(body: &str) -> Option<(String, String, String, bool)> {
    let rest = ["const ", "let ", "var "]
        .iter()
        .find_map(|kw| body.strip_prefix(kw))?;

    let eq = rest.find('=')?;
    let name = rest[..eq].split(':').next()?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let initializer = rest[eq + 1..].trim_start();
    let is_async = initializer.starts_with("async");
    let initializer = initializer.strip_prefix("async").unwrap_or(initializer).trim_start();

    // Only direct arrow functions; call expressions with function-valued
    // arguments (useCallback(...) and friends) are skipped.
    if !initializer.starts_with('(') {
        return None;
    }

    let open = initializer.find('(')?;
    let close = matching_paren(initializer, open)?;
    let params = initializer[open + 1..close].to_string();

    let after = initializer[close + 1..].trim();
    let return_type = after
        .strip_prefix(':')
        .and_then(|r| r.split("=>").next())
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    Some((name, params, return_type, is_async))
}

/// Split on commas at nesting depth zero, so object/generic/function-typed
/// parameters stay intact.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut prev = '\0';

    for c in text.chars() {
        match c {
            '(' | '{' | '[' | '<' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' => {
                if depth > 0 && prev != '=' {
                    depth -= 1;
                }
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                prev = c;
                continue;
            }
            _ => {}
        }
        current.push(c);
        prev = c;
    }

    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_params(raw: &str) -> Vec<ParamInfo> {
    split_top_level(raw)
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let part = part.trim();
            let (declaration, default) = match top_level_find(part, '=') {
                Some(idx) => (&part[..idx], true),
                None => (part, false),
            };

            let (name_part, type_name) = match top_level_find(declaration, ':') {
                Some(idx) => (
                    declaration[..idx].trim(),
                    declaration[idx + 1..].trim().to_string(),
                ),
                None => (declaration.trim(), "any".to_string()),
            };

            let optional = name_part.ends_with('?') || default;
            ParamInfo {
                name: name_part.trim_end_matches('?').to_string(),
                type_name,
                optional,
            }
        })
        .collect()
}

fn render_signature(
    name: &str,
    parameters: &[ParamInfo],
    return_type: &str,
    is_exported: bool,
    is_async: bool,
) -> String {
    let params = parameters
        .iter()
        .map(|p| {
            format!(
                "{}{}: {}",
                p.name,
                if p.optional { "?" } else { "" },
                p.type_name
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}{}function {name}({params}): {return_type}",
        if is_exported { "export " } else { "" },
        if is_async { "async " } else { "" },
    )
}

/// Collect a `/** ... */` block; returns the description (tag lines
/// excluded) and the index of the line after the block.
fn collect_doc_comment(lines: &[&str], start: usize) -> (Option<String>, usize) {
    let mut description = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i].trim();
        let inner = line
            .trim_end_matches("*/")
            .trim_start_matches("/**")
            .trim_start_matches('*')
            .trim();

        if !inner.is_empty() && !inner.starts_with('@') {
            description.push(inner.to_string());
        }

        if line.ends_with("*/") {
            i += 1;
            break;
        }
        i += 1;
    }

    let description = if description.is_empty() {
        None
    } else {
        Some(description.join("\n"))
    };
    (description, i)
}

fn paren_balance(text: &str) -> i32 {
    let mut balance = 0;
    for c in text.chars() {
        match c {
            '(' => balance += 1,
            ')' => balance -= 1,
            '{' if balance == 0 => break,
            _ => {}
        }
    }
    balance
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    for (idx, c) in text.char_indices() {
        if idx < open {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find a character at nesting depth zero (outside (), {}, [], <>).
///
/// The `>` of an arrow (`=>`) is not a closer, and a `=` followed by `>` is
/// never reported as a match.
fn top_level_find(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0i32;
    let bytes = text.as_bytes();
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '{' | '[' | '<' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' => {
                if depth > 0 && bytes.get(idx.wrapping_sub(1)) != Some(&b'=') {
                    depth -= 1;
                }
            }
            c if c == needle && depth == 0 => {
                if !(needle == '=' && bytes.get(idx + 1) == Some(&b'>')) {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
