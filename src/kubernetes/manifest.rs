//! YAML manifest parsing
//!
//! A single apply call may carry many `---`-separated documents; each is
//! converted to JSON for the API server. Null documents (stray separators,
//! comment-only blocks) are skipped.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(String),
    #[error("document has no kind")]
    MissingKind,
    #[error("document has no metadata.name")]
    MissingName,
}

/// Split manifest text into its documents, in order.
pub fn split_documents(text: &str) -> Result<Vec<Value>, ManifestError> {
    let mut documents = Vec::new();
    for deserializer in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(deserializer)
            .map_err(|err| ManifestError::InvalidYaml(err.to_string()))?;
        if value.is_null() {
            continue;
        }
        documents.push(value);
    }
    Ok(documents)
}

pub fn document_kind(document: &Value) -> Result<&str, ManifestError> {
    document
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(ManifestError::MissingKind)
}

pub fn document_name(document: &Value) -> Result<&str, ManifestError> {
    document
        .get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .ok_or(ManifestError::MissingName)
}

pub fn document_namespace(document: &Value) -> Option<&str> {
    document
        .get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DOCS: &str = r#"
apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: prod
spec:
  selector:
    app: web
---
apiVersion: v1
kind: Pod
metadata:
  name: web-0
spec:
  containers: []
"#;

    #[test]
    fn splits_multi_document_manifests_in_order() {
        let docs = split_documents(TWO_DOCS).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(document_kind(&docs[0]).unwrap(), "Service");
        assert_eq!(document_kind(&docs[1]).unwrap(), "Pod");
    }

    #[test]
    fn extracts_metadata_fields() {
        let docs = split_documents(TWO_DOCS).unwrap();
        assert_eq!(document_name(&docs[0]).unwrap(), "web");
        assert_eq!(document_namespace(&docs[0]), Some("prod"));
        assert_eq!(document_namespace(&docs[1]), None);
    }

    #[test]
    fn skips_empty_documents() {
        let docs = split_documents("---\n---\nkind: Pod\nmetadata:\n  name: a\n").unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn rejects_unparseable_yaml() {
        let err = split_documents("kind: [unclosed").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidYaml(_)));
    }

    #[test]
    fn missing_name_is_reported() {
        let docs = split_documents("kind: Pod\nmetadata: {}\n").unwrap();
        assert!(matches!(
            document_name(&docs[0]),
            Err(ManifestError::MissingName)
        ));
    }
}
