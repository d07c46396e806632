//! End-to-end apply and delete tests
//!
//! Drives kubectl_apply and kubectl_delete through the full HTTP + JSON-RPC
//! stack and asserts both the reported per-document outcome and what
//! actually reached the cluster.

mod common;

use common::{TestClient, TestServer};
use mcp_kube_server::kubernetes::ResourceKind;
use serde_json::{json, Value};

/// Pulls the apply report back out of the "Applied resources: {json}" text.
fn apply_report(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    let json_part = text
        .strip_prefix("Applied resources: ")
        .expect("Apply result must carry the report prefix");
    serde_json::from_str(json_part).unwrap()
}

#[tokio::test]
async fn apply_creates_missing_and_replaces_existing_documents() {
    let server = TestServer::spawn().await;
    server
        .cluster
        .seed_resource(ResourceKind::Service, "default", "web");
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let manifest = "\
kind: Service
metadata:
  name: web
---
kind: Pod
metadata:
  name: web-0
";
    let response = client
        .tool_call("kubectl_apply", json!({"yaml": manifest}))
        .await;

    let report = apply_report(&response);
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["status"], "replaced");
    assert_eq!(results[0]["kind"], "Service");
    assert_eq!(results[1]["status"], "created");
    assert_eq!(results[1]["name"], "web-0");

    assert!(server
        .cluster
        .has_resource(ResourceKind::Pod, "default", "web-0"));
    assert_eq!(
        server.cluster.calls(),
        vec![
            "read Service/default/web",
            "replace Service/default/web",
            "read Pod/default/web-0",
            "create Pod/default/web-0",
        ]
    );
}

#[tokio::test]
async fn apply_namespace_argument_beats_document_namespace() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let manifest = "\
kind: Pod
metadata:
  name: worker
  namespace: doc-ns
";
    let response = client
        .tool_call(
            "kubectl_apply",
            json!({"yaml": manifest, "namespace": "arg-ns"}),
        )
        .await;

    let report = apply_report(&response);
    assert_eq!(report["results"][0]["namespace"], "arg-ns");
    assert!(server
        .cluster
        .has_resource(ResourceKind::Pod, "arg-ns", "worker"));
}

#[tokio::test]
async fn apply_falls_back_to_document_namespace() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let manifest = "\
kind: Pod
metadata:
  name: worker
  namespace: doc-ns
";
    let response = client
        .tool_call("kubectl_apply", json!({"yaml": manifest}))
        .await;

    let report = apply_report(&response);
    assert_eq!(report["results"][0]["namespace"], "doc-ns");
    assert!(server
        .cluster
        .has_resource(ResourceKind::Pod, "doc-ns", "worker"));
}

#[tokio::test]
async fn apply_keeps_going_past_a_failing_document() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let manifest = "\
kind: CronTab
metadata:
  name: nightly
---
kind: Deployment
metadata:
  name: api
";
    let response = client
        .tool_call("kubectl_apply", json!({"yaml": manifest}))
        .await;

    let report = apply_report(&response);
    let results = report["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "failed");
    assert!(results[0]["error"]
        .as_str()
        .unwrap()
        .contains("unsupported resource kind"));
    assert_eq!(results[1]["status"], "created");
    assert!(server
        .cluster
        .has_resource(ResourceKind::Deployment, "default", "api"));
}

#[tokio::test]
async fn apply_rejects_unparseable_yaml() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let response = client
        .tool_call("kubectl_apply", json!({"yaml": "kind: [unclosed"}))
        .await;

    assert_eq!(response["error"]["code"], -32603);
    assert!(server.cluster.calls().is_empty());
}

#[tokio::test]
async fn delete_removes_an_existing_resource() {
    let server = TestServer::spawn().await;
    server
        .cluster
        .seed_resource(ResourceKind::Deployment, "prod", "api");
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let response = client
        .tool_call(
            "kubectl_delete",
            json!({"resource": "deployment", "name": "api", "namespace": "prod"}),
        )
        .await;

    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Deleted resource: "));
    assert!(!server
        .cluster
        .has_resource(ResourceKind::Deployment, "prod", "api"));
}

#[tokio::test]
async fn delete_missing_resource_is_an_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_with_bearer(server.base_url.clone()).await;

    let response = client
        .tool_call(
            "kubectl_delete",
            json!({"resource": "pod", "name": "ghost"}),
        )
        .await;

    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("ghost"));
}
