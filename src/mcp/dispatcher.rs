//! MCP Protocol Dispatcher
//!
//! Parses an envelope, validates the protocol version, routes by method
//! name and always produces exactly one response envelope. Tool failures
//! never escape as transport failures.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::protocol::{
    methods, InitializeResult, LoggingCapability, McpError, McpRequest, McpResponse,
    PromptsCapability, PromptsListResult, RequestId, ResourcesCapability, ResourcesListResult,
    ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCallResult, ToolsCapability,
    ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use super::registry::{ToolError, ToolRegistry};
use crate::kubernetes::ResourceGateway;

pub const SERVER_NAME: &str = "mcp-kube-server";

pub struct Dispatcher {
    registry: ToolRegistry,
    gateway: Arc<ResourceGateway>,
    server_version: String,
}

impl Dispatcher {
    pub fn new(gateway: Arc<ResourceGateway>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            gateway,
            server_version: format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
        }
    }

    /// Handle one request body, already parsed to JSON by the transport.
    pub async fn dispatch(&self, body: Value) -> McpResponse {
        // Fish the id out before strict envelope parsing so even a rejected
        // request echoes its correlation value.
        let id: Option<RequestId> = body
            .get("id")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());

        let request: McpRequest = match serde_json::from_value(body) {
            Ok(request) => request,
            Err(err) => {
                return McpResponse::error(id, McpError::InvalidRequest(err.to_string()));
            }
        };

        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return McpResponse::error(
                id,
                McpError::InvalidRequest("unsupported jsonrpc version".to_string()),
            );
        }

        debug!("MCP request: method={}", request.method);

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(),
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => self.handle_tools_call(&request).await,
            methods::RESOURCES_LIST => {
                serde_json::to_value(ResourcesListResult { resources: vec![] })
                    .map_err(|err| McpError::InternalError(err.to_string()))
            }
            methods::PROMPTS_LIST => serde_json::to_value(PromptsListResult { prompts: vec![] })
                .map_err(|err| McpError::InternalError(err.to_string())),
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        match result {
            Ok(value) => McpResponse::success(id, value),
            Err(error) => McpResponse::error(id, error),
        }
    }

    fn handle_initialize(&self) -> Result<Value, McpError> {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
                resources: ResourcesCapability {},
                prompts: PromptsCapability {},
                logging: LoggingCapability {},
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: self.server_version.clone(),
            },
        };
        serde_json::to_value(result).map_err(|err| McpError::InternalError(err.to_string()))
    }

    fn handle_tools_list(&self) -> Result<Value, McpError> {
        let result = ToolsListResult {
            tools: self.registry.list().to_vec(),
        };
        serde_json::to_value(result).map_err(|err| McpError::InternalError(err.to_string()))
    }

    async fn handle_tools_call(&self, request: &McpRequest) -> Result<Value, McpError> {
        let params: ToolsCallParams = request
            .params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| McpError::InvalidParams(err.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))?;

        let arguments = params.arguments.unwrap_or_else(|| serde_json::json!({}));
        let result = self.call_tool(&params.name, arguments).await;

        let result = match result {
            Ok(result) => result,
            Err(ToolError::InvalidArgs { tool, message }) => {
                return Err(McpError::InvalidParams(format!("{}: {}", tool, message)));
            }
            Err(err) => {
                warn!("Tool call failed: {}", err);
                return Err(McpError::InternalError(err.to_string()));
            }
        };

        serde_json::to_value(result).map_err(|err| McpError::InternalError(err.to_string()))
    }

    /// Direct invocation path, bypassing the JSON-RPC envelope. Shares the
    /// registry's parse/execute pipeline with `tools/call`.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<ToolsCallResult, ToolError> {
        self.registry.invoke(&self.gateway, name, args).await
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}
