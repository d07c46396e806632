//! Resource gateway
//!
//! Maps abstract (kind, namespace, name) operations onto the cluster
//! client, including the per-document create-or-replace apply path.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{ClusterClient, ClusterError};
use super::kind::ResourceKind;
use super::manifest::{
    document_kind, document_name, document_namespace, split_documents, ManifestError,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Per-document result of an apply call. A failing document never aborts
/// the batch; callers see exactly which documents succeeded and how.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    pub results: Vec<DocumentOutcome>,
}

impl ApplyReport {
    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|outcome| matches!(outcome.status, DocumentStatus::Failed { .. }))
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentOutcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentStatus {
    Created { resource: Value },
    Replaced { resource: Value },
    Failed { error: String },
}

pub struct ResourceGateway {
    client: Arc<dyn ClusterClient>,
    default_namespace: Option<String>,
}

impl ResourceGateway {
    pub fn new(client: Arc<dyn ClusterClient>, default_namespace: Option<String>) -> Self {
        Self {
            client,
            default_namespace,
        }
    }

    /// Namespace resolution order: explicit argument, then the document's
    /// own declared namespace (apply only), then the configured default,
    /// then the literal `default`.
    fn resolve_namespace(&self, explicit: Option<&str>, from_document: Option<&str>) -> String {
        explicit
            .or(from_document)
            .or(self.default_namespace.as_deref())
            .unwrap_or("default")
            .to_string()
    }

    fn parse_kind(resource: &str) -> Result<ResourceKind, GatewayError> {
        ResourceKind::parse(resource)
            .ok_or_else(|| GatewayError::UnsupportedKind(resource.to_string()))
    }

    /// Fetch a single resource when `name` is given, else list all of
    /// `kind` in the namespace.
    pub async fn get(
        &self,
        resource: &str,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let kind = Self::parse_kind(resource)?;
        let namespace = self.resolve_namespace(namespace, None);

        match name {
            Some(name) => match self.client.read(kind, &namespace, name).await? {
                Some(resource) => Ok(resource),
                None => Err(GatewayError::Cluster(ClusterError::NotFound(format!(
                    "{}/{} in namespace {}",
                    kind.as_str(),
                    name,
                    namespace
                )))),
            },
            None => Ok(self.client.list(kind, &namespace).await?),
        }
    }

    /// Upsert every document in `manifest_text`, best-effort per document.
    ///
    /// The read-then-write probe is not atomic against concurrent external
    /// mutation; a conflicting concurrent apply may race. A probe failure
    /// other than not-found fails the document rather than being treated
    /// as absence.
    pub async fn apply(
        &self,
        manifest_text: &str,
        namespace: Option<&str>,
    ) -> Result<ApplyReport, GatewayError> {
        let documents = split_documents(manifest_text)
            .map_err(|err| GatewayError::InvalidManifest(err.to_string()))?;

        let mut results = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            results.push(self.apply_document(index, document, namespace).await);
        }
        Ok(ApplyReport { results })
    }

    async fn apply_document(
        &self,
        index: usize,
        document: &Value,
        namespace: Option<&str>,
    ) -> DocumentOutcome {
        let declared_namespace = document_namespace(document).map(|s| s.to_string());
        let resolved_namespace = self.resolve_namespace(namespace, declared_namespace.as_deref());

        let kind_str = match document_kind(document) {
            Ok(kind) => kind.to_string(),
            Err(err) => return Self::failed_outcome(index, None, None, resolved_namespace, err),
        };
        let name = match document_name(document) {
            Ok(name) => name.to_string(),
            Err(err) => {
                return Self::failed_outcome(
                    index,
                    Some(kind_str),
                    None,
                    resolved_namespace,
                    err,
                )
            }
        };

        let kind = match ResourceKind::parse(&kind_str) {
            Some(kind) => kind,
            None => {
                warn!(
                    "Apply document {} skipped: unsupported kind {}",
                    index, kind_str
                );
                return DocumentOutcome {
                    index,
                    kind: Some(kind_str.clone()),
                    name: Some(name),
                    namespace: Some(resolved_namespace),
                    status: DocumentStatus::Failed {
                        error: GatewayError::UnsupportedKind(kind_str).to_string(),
                    },
                };
            }
        };

        let status = match self.client.read(kind, &resolved_namespace, &name).await {
            Ok(Some(_)) => {
                debug!(
                    "Replacing existing {}/{} in namespace {}",
                    kind.as_str(),
                    name,
                    resolved_namespace
                );
                match self
                    .client
                    .replace(kind, &resolved_namespace, &name, document)
                    .await
                {
                    Ok(resource) => DocumentStatus::Replaced { resource },
                    Err(err) => DocumentStatus::Failed {
                        error: err.to_string(),
                    },
                }
            }
            Ok(None) => {
                debug!(
                    "Creating {}/{} in namespace {}",
                    kind.as_str(),
                    name,
                    resolved_namespace
                );
                match self.client.create(kind, &resolved_namespace, document).await {
                    Ok(resource) => DocumentStatus::Created { resource },
                    Err(err) => DocumentStatus::Failed {
                        error: err.to_string(),
                    },
                }
            }
            // A failing probe is not absence: creating on top of a transient
            // error would mask it.
            Err(err) => {
                warn!(
                    "Existence probe failed for {}/{} in namespace {}: {}",
                    kind.as_str(),
                    name,
                    resolved_namespace,
                    err
                );
                DocumentStatus::Failed {
                    error: err.to_string(),
                }
            }
        };

        DocumentOutcome {
            index,
            kind: Some(kind.as_str().to_string()),
            name: Some(name),
            namespace: Some(resolved_namespace),
            status,
        }
    }

    fn failed_outcome(
        index: usize,
        kind: Option<String>,
        name: Option<String>,
        namespace: String,
        err: ManifestError,
    ) -> DocumentOutcome {
        DocumentOutcome {
            index,
            kind,
            name,
            namespace: Some(namespace),
            status: DocumentStatus::Failed {
                error: err.to_string(),
            },
        }
    }

    /// Remove the named resource. Absence surfaces as the cluster client's
    /// not-found error.
    pub async fn delete(
        &self,
        resource: &str,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<Value, GatewayError> {
        let kind = Self::parse_kind(resource)?;
        let namespace = self.resolve_namespace(namespace, None);
        Ok(self.client.delete(kind, &namespace, name).await?)
    }

    /// Most recent `lines` lines (full log when absent) for the given
    /// container (default container when omitted).
    pub async fn logs(
        &self,
        pod: &str,
        namespace: Option<&str>,
        container: Option<&str>,
        lines: Option<i64>,
    ) -> Result<String, GatewayError> {
        let namespace = self.resolve_namespace(namespace, None);
        Ok(self
            .client
            .pod_logs(&namespace, pod, container, lines)
            .await?)
    }
}
