//! MCP Kubernetes gateway server library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod auth;
pub mod config;
pub mod kubernetes;
pub mod mcp;
pub mod rate_limit;
pub mod server;

// Re-export commonly used types for convenience
pub use auth::{Principal, StaticCredentialStore, TokenAuthority};
pub use kubernetes::{ClusterClient, ClusterConnection, ResourceGateway};
pub use mcp::Dispatcher;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
