//! MCP Tool Registry
//!
//! Fixed catalog of invocable tools. Arguments are parsed into per-tool
//! structs before anything touches the gateway; unknown and missing fields
//! are rejected at this boundary.

use serde::Deserialize;
use serde_json::{json, Value};

use super::protocol::{ToolDefinition, ToolsCallResult};
use crate::kubernetes::{GatewayError, ResourceGateway};

// ============================================================================
// Typed tool arguments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetArgs {
    pub resource: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyArgs {
    pub yaml: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteArgs {
    pub resource: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsArgs {
    pub pod: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub lines: Option<i64>,
}

/// A fully validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Get(GetArgs),
    Apply(ApplyArgs),
    Delete(DeleteArgs),
    Logs(LogsArgs),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The name is not in the catalog; distinct from a known tool failing.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArgs { tool: String, message: String },
    #[error("{0}")]
    Execution(#[from] GatewayError),
}

// ============================================================================
// Registry
// ============================================================================

pub const TOOL_GET: &str = "kubectl_get";
pub const TOOL_APPLY: &str = "kubectl_apply";
pub const TOOL_DELETE: &str = "kubectl_delete";
pub const TOOL_LOGS: &str = "kubectl_logs";

/// Static tool catalog. Built once at startup; the list order is stable and
/// is what clients see from `tools/list`.
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: vec![
                ToolDefinition {
                    name: TOOL_GET.to_string(),
                    description: "Get Kubernetes resources".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "resource": {
                                "type": "string",
                                "description": "Resource kind (e.g. pods, services, deployments)",
                            },
                            "namespace": {
                                "type": "string",
                                "description": "Namespace",
                            },
                            "name": {
                                "type": "string",
                                "description": "Resource name (optional; omit to list)",
                            },
                        },
                        "required": ["resource"],
                    }),
                },
                ToolDefinition {
                    name: TOOL_APPLY.to_string(),
                    description: "Apply Kubernetes resource manifests (create or replace)"
                        .to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "yaml": {
                                "type": "string",
                                "description": "YAML manifest content, multi-document supported",
                            },
                            "namespace": {
                                "type": "string",
                                "description": "Namespace",
                            },
                        },
                        "required": ["yaml"],
                    }),
                },
                ToolDefinition {
                    name: TOOL_DELETE.to_string(),
                    description: "Delete a Kubernetes resource".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "resource": {
                                "type": "string",
                                "description": "Resource kind",
                            },
                            "name": {
                                "type": "string",
                                "description": "Resource name",
                            },
                            "namespace": {
                                "type": "string",
                                "description": "Namespace",
                            },
                        },
                        "required": ["resource", "name"],
                    }),
                },
                ToolDefinition {
                    name: TOOL_LOGS.to_string(),
                    description: "Get Pod logs".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "properties": {
                            "pod": {
                                "type": "string",
                                "description": "Pod name",
                            },
                            "namespace": {
                                "type": "string",
                                "description": "Namespace",
                            },
                            "container": {
                                "type": "string",
                                "description": "Container name (optional)",
                            },
                            "lines": {
                                "type": "number",
                                "description": "Number of log lines",
                            },
                        },
                        "required": ["pod"],
                    }),
                },
            ],
        }
    }

    /// The advertised catalog, in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Validate `args` against the named tool's parameter struct.
    pub fn parse(&self, name: &str, args: Value) -> Result<ToolCall, ToolError> {
        let invalid = |message: serde_json::Error| ToolError::InvalidArgs {
            tool: name.to_string(),
            message: message.to_string(),
        };
        match name {
            TOOL_GET => Ok(ToolCall::Get(serde_json::from_value(args).map_err(invalid)?)),
            TOOL_APPLY => Ok(ToolCall::Apply(
                serde_json::from_value(args).map_err(invalid)?,
            )),
            TOOL_DELETE => Ok(ToolCall::Delete(
                serde_json::from_value(args).map_err(invalid)?,
            )),
            TOOL_LOGS => Ok(ToolCall::Logs(
                serde_json::from_value(args).map_err(invalid)?,
            )),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Parse and execute a tool call against the gateway.
    ///
    /// This is the single invocation path shared by `tools/call` and direct
    /// callers; both see the same result shape for a given tool.
    pub async fn invoke(
        &self,
        gateway: &ResourceGateway,
        name: &str,
        args: Value,
    ) -> Result<ToolsCallResult, ToolError> {
        let call = self.parse(name, args)?;
        let result = match call {
            ToolCall::Get(args) => {
                let value = gateway
                    .get(&args.resource, args.namespace.as_deref(), args.name.as_deref())
                    .await?;
                ToolsCallResult::json(&value)
                    .map_err(|err| GatewayError::InvalidManifest(err.to_string()))?
            }
            ToolCall::Apply(args) => {
                let report = gateway
                    .apply(&args.yaml, args.namespace.as_deref())
                    .await?;
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|err| GatewayError::InvalidManifest(err.to_string()))?;
                ToolsCallResult::text(format!("Applied resources: {}", text))
            }
            ToolCall::Delete(args) => {
                let value = gateway
                    .delete(&args.resource, &args.name, args.namespace.as_deref())
                    .await?;
                let text = serde_json::to_string_pretty(&value)
                    .map_err(|err| GatewayError::InvalidManifest(err.to_string()))?;
                ToolsCallResult::text(format!("Deleted resource: {}", text))
            }
            ToolCall::Logs(args) => {
                let logs = gateway
                    .logs(
                        &args.pod,
                        args.namespace.as_deref(),
                        args.container.as_deref(),
                        args.lines,
                    )
                    .await?;
                ToolsCallResult::text(logs)
            }
        };
        Ok(result)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_stable() {
        let registry = ToolRegistry::new();
        let names: Vec<&str> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![TOOL_GET, TOOL_APPLY, TOOL_DELETE, TOOL_LOGS]
        );
    }

    #[test]
    fn parse_valid_get_args() {
        let registry = ToolRegistry::new();
        let call = registry
            .parse(TOOL_GET, json!({"resource": "pods", "namespace": "prod"}))
            .unwrap();
        assert_eq!(
            call,
            ToolCall::Get(GetArgs {
                resource: "pods".to_string(),
                namespace: Some("prod".to_string()),
                name: None,
            })
        );
    }

    #[test]
    fn unknown_tool_is_a_distinct_error() {
        let registry = ToolRegistry::new();
        let err = registry.parse("kubectl_explode", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let registry = ToolRegistry::new();
        let err = registry
            .parse(TOOL_DELETE, json!({"resource": "pods"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { .. }));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let registry = ToolRegistry::new();
        let err = registry
            .parse(TOOL_LOGS, json!({"pod": "web-0", "follow": true}))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { .. }));
    }

    #[test]
    fn every_tool_schema_declares_its_required_fields() {
        let registry = ToolRegistry::new();
        for tool in registry.list() {
            let required = tool.input_schema["required"].as_array().unwrap();
            assert!(!required.is_empty(), "{} has no required fields", tool.name);
        }
    }
}
