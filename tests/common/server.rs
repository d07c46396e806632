//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own in-memory fake cluster.
//! The fake records every call and can be seeded with resources, so tests
//! can assert both the HTTP surface and what reached the cluster.

use super::constants::*;
use async_trait::async_trait;
use mcp_kube_server::auth::{PasswordHasher, Principal, StaticCredentialStore, TokenAuthority};
use mcp_kube_server::kubernetes::{ClusterClient, ClusterError, ResourceGateway, ResourceKind};
use mcp_kube_server::mcp::Dispatcher;
use mcp_kube_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// In-memory cluster fake shared between the server under test and the test
/// body.
pub struct FakeCluster {
    resources: Mutex<BTreeMap<String, Value>>,
    logs: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

fn resource_key(kind: ResourceKind, namespace: &str, name: &str) -> String {
    format!("{}/{}/{}", kind.as_str(), namespace, name)
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(BTreeMap::new()),
            logs: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn seed_resource(&self, kind: ResourceKind, namespace: &str, name: &str) {
        self.resources.lock().unwrap().insert(
            resource_key(kind, namespace, name),
            json!({
                "kind": kind.as_str(),
                "metadata": {"name": name, "namespace": namespace},
            }),
        );
    }

    pub fn seed_logs(&self, namespace: &str, pod: &str, logs: &str) {
        self.logs
            .lock()
            .unwrap()
            .insert(format!("{}/{}", namespace, pod), logs.to_string());
    }

    pub fn has_resource(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.resources
            .lock()
            .unwrap()
            .contains_key(&resource_key(kind, namespace, name))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Value>, ClusterError> {
        self.record(format!("read {}/{}/{}", kind.as_str(), namespace, name));
        Ok(self
            .resources
            .lock()
            .unwrap()
            .get(&resource_key(kind, namespace, name))
            .cloned())
    }

    async fn list(&self, kind: ResourceKind, namespace: &str) -> Result<Value, ClusterError> {
        self.record(format!("list {}/{}", kind.as_str(), namespace));
        let prefix = format!("{}/{}/", kind.as_str(), namespace);
        let items: Vec<Value> = self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, value)| value.clone())
            .collect();
        Ok(json!({"kind": format!("{}List", kind.as_str()), "items": items}))
    }

    async fn create(
        &self,
        kind: ResourceKind,
        namespace: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError> {
        let name = manifest["metadata"]["name"].as_str().unwrap_or("?");
        self.record(format!("create {}/{}/{}", kind.as_str(), namespace, name));
        self.resources
            .lock()
            .unwrap()
            .insert(resource_key(kind, namespace, name), manifest.clone());
        Ok(manifest.clone())
    }

    async fn replace(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
        manifest: &Value,
    ) -> Result<Value, ClusterError> {
        self.record(format!("replace {}/{}/{}", kind.as_str(), namespace, name));
        self.resources
            .lock()
            .unwrap()
            .insert(resource_key(kind, namespace, name), manifest.clone());
        Ok(manifest.clone())
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError> {
        self.record(format!("delete {}/{}/{}", kind.as_str(), namespace, name));
        match self
            .resources
            .lock()
            .unwrap()
            .remove(&resource_key(kind, namespace, name))
        {
            Some(_) => Ok(json!({"status": "Success"})),
            None => Err(ClusterError::NotFound(format!(
                "{}/{} in namespace {}",
                kind.as_str(),
                name,
                namespace
            ))),
        }
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        _container: Option<&str>,
        lines: Option<i64>,
    ) -> Result<String, ClusterError> {
        self.record(format!("logs {}/{} lines={:?}", namespace, pod, lines));
        match self.logs.lock().unwrap().get(&format!("{}/{}", namespace, pod)) {
            Some(logs) => Ok(logs.clone()),
            None => Err(ClusterError::NotFound(format!(
                "Pod/{} in namespace {}",
                pod, namespace
            ))),
        }
    }
}

/// Test server instance backed by an in-memory fake cluster.
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Fake cluster for seeding state and asserting calls
    pub cluster: Arc<FakeCluster>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with default config.
    pub async fn spawn() -> Self {
        Self::spawn_with(|config| config).await
    }

    /// Spawns a test server after letting the caller adjust the config.
    pub async fn spawn_with(adjust: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        let cluster = Arc::new(FakeCluster::new());
        let gateway = Arc::new(ResourceGateway::new(
            cluster.clone() as Arc<dyn ClusterClient>,
            None,
        ));
        let dispatcher = Arc::new(Dispatcher::new(gateway));

        let token_authority = Arc::new(TokenAuthority::new(
            TEST_JWT_SECRET,
            Duration::from_secs(3600),
        ));
        let admin = Principal {
            id: "1".to_string(),
            username: ADMIN_USER.to_string(),
            roles: vec![
                "admin".to_string(),
                "kubernetes:read".to_string(),
                "kubernetes:write".to_string(),
            ],
        };
        let credential_store = Arc::new(
            StaticCredentialStore::new(admin, ADMIN_PASS, PasswordHasher::new(1))
                .expect("Failed to build credential store"),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = adjust(ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            // Generous default so only the dedicated tests trip the limiter.
            rate_limit_max: 10_000,
            rate_limit_window_ms: 60_000,
            ..Default::default()
        });

        let app = make_app(config, dispatcher, token_authority, credential_store)
            .expect("Failed to build app");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            cluster,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling /health
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client
                .get(format!("{}/health", self.base_url))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
