//! Schema translator: JSON-schema-like tool input shapes to validators.
//!
//! Remote tool servers advertise input schemas in a restricted JSON-Schema
//! subset, and not always well-formed ones. Translation is total: any value,
//! however malformed, produces a usable validator. The failure mode is
//! always a *more permissive* validator, never an error, so unknown schema
//! shapes cannot break tool discovery.

use std::collections::BTreeMap;

use serde_json::Value;

/// A structured validation failure: the path of the offending field and a
/// human-readable reason. Returned to the caller (ultimately the model) so
/// it can retry with corrected arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Restricted JSON-Schema subset mirrored as a recursive node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String,
    Number,
    Boolean,
    /// A sequence of unconstrained values. Element-level schemas are not
    /// recursively enforced; this mirrors the original bridge and is a
    /// documented limitation, not an oversight.
    Array,
    Object {
        properties: BTreeMap<String, SchemaNode>,
        required: Vec<String>,
    },
    /// Accept anything. Produced for missing or unrecognized `type` tags so
    /// unknown/future schema shapes stay usable.
    Any,
}

impl SchemaNode {
    /// Parse a schema value into a node. Never fails: anything that cannot
    /// be interpreted degrades to [`SchemaNode::Any`].
    pub fn parse(schema: &Value) -> Self {
        let Some(kind) = schema.get("type").and_then(Value::as_str) else {
            return SchemaNode::Any;
        };

        match kind {
            "string" => SchemaNode::String,
            "number" | "integer" => SchemaNode::Number,
            "boolean" => SchemaNode::Boolean,
            "array" => SchemaNode::Array,
            "object" => {
                let properties = schema
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, child)| (name.clone(), SchemaNode::parse(child)))
                            .collect()
                    })
                    .unwrap_or_default();

                // Non-string entries in `required` are ignored; a required
                // name with no matching property degrades to permissive
                // (the requirement is dropped) rather than failing.
                let required = schema
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();

                SchemaNode::Object {
                    properties,
                    required,
                }
            }
            _ => SchemaNode::Any,
        }
    }

    /// Validate a value against this node, returning the normalized value.
    ///
    /// Normalization drops object keys that are not declared properties;
    /// everything else passes through unchanged.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.validate_at("", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<Value, ValidationError> {
        match self {
            SchemaNode::Any => Ok(value.clone()),
            SchemaNode::String => {
                if value.is_string() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected a string"))
                }
            }
            SchemaNode::Number => {
                if value.is_number() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected a number"))
                }
            }
            SchemaNode::Boolean => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected a boolean"))
                }
            }
            SchemaNode::Array => {
                if value.is_array() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected an array"))
                }
            }
            SchemaNode::Object {
                properties,
                required,
            } => {
                let Some(map) = value.as_object() else {
                    return Err(ValidationError::new(path, "expected an object"));
                };

                let mut normalized = serde_json::Map::new();

                for (name, node) in properties {
                    let child_path = join_path(path, name);
                    match map.get(name) {
                        Some(child) => {
                            normalized.insert(name.clone(), node.validate_at(&child_path, child)?);
                        }
                        None => {
                            if required.iter().any(|r| r == name) {
                                return Err(ValidationError::new(
                                    child_path,
                                    "missing required field",
                                ));
                            }
                        }
                    }
                }

                Ok(Value::Object(normalized))
            }
        }
    }

    /// Whether this node accepts every input.
    pub fn is_permissive(&self) -> bool {
        matches!(self, SchemaNode::Any)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
