//! Kubernetes resource access
//!
//! `ClusterClient` talks to the control plane; `ResourceGateway` maps
//! abstract (kind, namespace, name) operations onto it, including the
//! multi-document create-or-replace apply path.

pub mod client;
pub mod gateway;
pub mod kind;
pub mod manifest;

pub use client::{ClusterClient, ClusterConnection, ClusterError, HttpClusterClient};
pub use gateway::{ApplyReport, DocumentOutcome, DocumentStatus, GatewayError, ResourceGateway};
pub use kind::ResourceKind;
