//! MCP (Model Context Protocol) front-end
//!
//! Exposes the cluster-management tools over JSON-RPC 2.0. The dispatcher
//! owns the method routing; the registry owns the tool catalog and typed
//! argument parsing.
//!
//! ## Architecture
//!
//! - Transport: HTTP POST at `/mcp` (one envelope in, one envelope out)
//! - Auth: bearer token, same as the rest of the HTTP API
//! - Tools: fixed catalog of kubectl-style operations

pub mod dispatcher;
pub mod protocol;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::{ToolCall, ToolError, ToolRegistry};
