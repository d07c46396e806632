//! HTTP client for the Kubernetes API server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Certificate, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::kind::ResourceKind;

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("cluster API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("cluster transport error: {0}")]
    Transport(String),
}

/// Executes verbs against a remote control plane.
///
/// `read` models "not found" as a normal `Ok(None)` return so callers can
/// distinguish genuine absence from transient failures.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Value>, ClusterError>;

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Value, ClusterError>;

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError>;

    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError>;

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError>;

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        lines: Option<i64>,
    ) -> Result<String, ClusterError>;
}

/// How to locate and authenticate against the cluster.
#[derive(Debug, Clone)]
pub enum ClusterConnection {
    /// Service-account token + `KUBERNETES_SERVICE_HOST` env, for pods
    /// running inside the cluster.
    InCluster,
    /// Explicit kubeconfig file.
    Kubeconfig(PathBuf),
    /// `$KUBECONFIG` if set, else `~/.kube/config`.
    Default,
}

const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Where the API server is and how to trust it, resolved from a
/// `ClusterConnection` before the HTTP client is built.
#[derive(Debug)]
struct Endpoint {
    server: String,
    token: Option<String>,
    /// PEM bundle to trust instead of the system roots.
    ca_pem: Option<Vec<u8>>,
    /// Explicitly requested by the kubeconfig.
    skip_tls_verify: bool,
}

/// Minimal kubeconfig model: enough to pull a server URL and bearer token
/// out of the current context.
#[derive(Debug, Deserialize)]
struct KubeconfigFile {
    clusters: Vec<NamedCluster>,
    users: Vec<NamedUser>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    server: String,
    #[serde(rename = "certificate-authority")]
    certificate_authority: Option<String>,
    #[serde(rename = "certificate-authority-data")]
    certificate_authority_data: Option<String>,
    #[serde(rename = "insecure-skip-tls-verify", default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Deserialize, Default)]
struct UserEntry {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

/// reqwest-backed `ClusterClient`.
pub struct HttpClusterClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClusterClient {
    pub fn connect(connection: &ClusterConnection, timeout: Duration) -> Result<Self> {
        let endpoint = match connection {
            ClusterConnection::InCluster => {
                let host = std::env::var("KUBERNETES_SERVICE_HOST")
                    .context("KUBERNETES_SERVICE_HOST not set; not running in a cluster?")?;
                let port = std::env::var("KUBERNETES_SERVICE_PORT")
                    .unwrap_or_else(|_| "443".to_string());
                let token = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN_PATH)
                    .context("Failed to read service account token")?;
                let ca_pem = std::fs::read(SERVICE_ACCOUNT_CA_PATH)
                    .context("Failed to read service account CA certificate")?;
                info!("Connecting to Kubernetes with in-cluster credentials");
                Endpoint {
                    server: format!("https://{}:{}", host, port),
                    token: Some(token.trim().to_string()),
                    ca_pem: Some(ca_pem),
                    skip_tls_verify: false,
                }
            }
            ClusterConnection::Kubeconfig(path) => {
                info!("Connecting to Kubernetes with kubeconfig {:?}", path);
                Self::from_kubeconfig(path)?
            }
            ClusterConnection::Default => {
                let path = std::env::var("KUBECONFIG").map(PathBuf::from).or_else(|_| {
                    std::env::var("HOME")
                        .map(|home| PathBuf::from(home).join(".kube").join("config"))
                })?;
                info!("Connecting to Kubernetes with default kubeconfig {:?}", path);
                Self::from_kubeconfig(&path)?
            }
        };

        let mut builder = reqwest::Client::builder().timeout(timeout);
        match &endpoint.ca_pem {
            Some(pem) => {
                let certificate = Certificate::from_pem(pem)
                    .context("Failed to parse cluster CA certificate")?;
                builder = builder.add_root_certificate(certificate);
            }
            None if endpoint.skip_tls_verify => {
                warn!("TLS verification disabled by kubeconfig insecure-skip-tls-verify");
                builder = builder.danger_accept_invalid_certs(true);
            }
            // No CA on record: the API server certificate must chain to the
            // system roots.
            None => {}
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let base_url = endpoint.server.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            token: endpoint.token,
        })
    }

    fn from_kubeconfig(path: &PathBuf) -> Result<Endpoint> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read kubeconfig {:?}", path))?;
        let config: KubeconfigFile =
            serde_yaml::from_str(&text).context("Failed to parse kubeconfig")?;

        let context_name = match &config.current_context {
            Some(name) => name.clone(),
            None => match config.contexts.first() {
                Some(ctx) => ctx.name.clone(),
                None => bail!("Kubeconfig has no contexts"),
            },
        };
        let context = config
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .with_context(|| format!("Context {} not found in kubeconfig", context_name))?;

        let cluster = config
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .with_context(|| format!("Cluster {} not found in kubeconfig", context.context.cluster))?;

        let token = config
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .and_then(|u| u.user.token.clone());

        let entry = &cluster.cluster;
        let ca_pem = match (&entry.certificate_authority_data, &entry.certificate_authority) {
            (Some(data), _) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(data.trim())
                    .context("Failed to decode certificate-authority-data")?,
            ),
            (None, Some(ca_path)) => Some(
                std::fs::read(ca_path)
                    .with_context(|| format!("Failed to read certificate authority {}", ca_path))?,
            ),
            (None, None) => None,
        };

        Ok(Endpoint {
            server: entry.server.clone(),
            token,
            ca_pem,
            skip_tls_verify: entry.insecure_skip_tls_verify,
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ClusterError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|err| ClusterError::Transport(err.to_string()))
    }

    async fn into_api_error(response: reqwest::Response) -> ClusterError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        ClusterError::Api { status, message }
    }

    async fn json_or_error(response: reqwest::Response) -> Result<Value, ClusterError> {
        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|err| ClusterError::Transport(err.to_string()))
    }
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Value>, ClusterError> {
        let path = kind.api_path(namespace, Some(name));
        let response = self.request(Method::GET, &path, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::json_or_error(response).await.map(Some)
    }

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Value, ClusterError> {
        let path = kind.api_path(namespace, None);
        let response = self.request(Method::GET, &path, None).await?;
        Self::json_or_error(response).await
    }

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError> {
        let path = kind.api_path(namespace, None);
        let response = self.request(Method::POST, &path, Some(manifest)).await?;
        Self::json_or_error(response).await
    }

    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError> {
        let path = kind.api_path(namespace, Some(name));
        let response = self.request(Method::PUT, &path, Some(manifest)).await?;
        Self::json_or_error(response).await
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let path = kind.api_path(namespace, Some(name));
        let response = self.request(Method::DELETE, &path, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound(format!(
                "{}/{} in namespace {}",
                kind.as_str(),
                name,
                namespace
            )));
        }
        Self::json_or_error(response).await
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        lines: Option<i64>,
    ) -> Result<String, ClusterError> {
        let mut path = format!("/api/v1/namespaces/{}/pods/{}/log", namespace, pod);
        let mut params = Vec::new();
        if let Some(container) = container {
            params.push(format!("container={}", container));
        }
        if let Some(lines) = lines {
            params.push(format!("tailLines={}", lines));
        }
        if !params.is_empty() {
            path = format!("{}?{}", path, params.join("&"));
        }

        let response = self.request(Method::GET, &path, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClusterError::NotFound(format!(
                "Pod/{} in namespace {}",
                pod, namespace
            )));
        }
        if !response.status().is_success() {
            return Err(Self::into_api_error(response).await);
        }
        response
            .text()
            .await
            .map_err(|err| ClusterError::Transport(err.to_string()))
    }
}
