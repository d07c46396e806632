/// Closed set of resource kinds the gateway knows how to address.
/// Extending it is a deliberate change here, not runtime discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pod,
    Service,
    Deployment,
    Namespace,
}

impl ResourceKind {
    /// Parse a user-supplied kind, accepting the usual kubectl aliases
    /// ("pods", "svc", "deploy", "ns", ...) case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" => Some(ResourceKind::Pod),
            "service" | "services" | "svc" => Some(ResourceKind::Service),
            "deployment" | "deployments" | "deploy" => Some(ResourceKind::Deployment),
            "namespace" | "namespaces" | "ns" => Some(ResourceKind::Namespace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Service => "Service",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Namespace => "Namespace",
        }
    }

    /// API server path for the collection or a named resource.
    pub fn api_path(&self, namespace: &str, name: Option<&str>) -> String {
        let collection = match self {
            ResourceKind::Pod => format!("/api/v1/namespaces/{}/pods", namespace),
            ResourceKind::Service => format!("/api/v1/namespaces/{}/services", namespace),
            ResourceKind::Deployment => {
                format!("/apis/apps/v1/namespaces/{}/deployments", namespace)
            }
            ResourceKind::Namespace => "/api/v1/namespaces".to_string(),
        };
        match name {
            Some(name) => format!("{}/{}", collection, name),
            None => collection,
        }
    }
}
