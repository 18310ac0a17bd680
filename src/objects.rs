//! Generic object model for listed resources.
//!
//! Cluster objects stay dynamically typed: a page is a list of JSON maps, and
//! only `apiVersion`, `kind` and `metadata.{name,namespace}` are ever read.

use serde_json::{json, Map, Value};

use crate::k8s::catalog::{split_group_version, ResourceIdentity};

/// A single cluster object, keys in the order the server sent them.
pub type Object = Map<String, Value>;

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub resource: ResourceIdentity,
    pub items: Vec<Object>,
    /// Empty when the server has nothing more for this resource type.
    pub continue_token: String,
}

impl Page {
    pub fn new(resource: ResourceIdentity, items: Vec<Object>, continue_token: impl Into<String>) -> Self {
        Self {
            resource,
            items,
            continue_token: continue_token.into(),
        }
    }

    pub fn is_last(&self) -> bool {
        self.continue_token.is_empty()
    }

    /// The page as a Kubernetes list document (`PodList`, `ClusterRoleList`, ...).
    pub fn to_list(&self) -> Value {
        let mut metadata = Map::new();
        if !self.continue_token.is_empty() {
            metadata.insert("continue".into(), Value::String(self.continue_token.clone()));
        }
        json!({
            "apiVersion": self.resource.api_version(),
            "kind": format!("{}List", self.resource.kind),
            "metadata": metadata,
            "items": self.items,
        })
    }
}

pub fn kind(obj: &Object) -> &str {
    obj.get("kind").and_then(Value::as_str).unwrap_or_default()
}

pub fn api_version(obj: &Object) -> &str {
    obj.get("apiVersion").and_then(Value::as_str).unwrap_or_default()
}

fn metadata_str<'a>(obj: &'a Object, field: &str) -> &'a str {
    obj.get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

pub fn name(obj: &Object) -> &str {
    metadata_str(obj, "name")
}

/// Empty for cluster-scoped objects.
pub fn namespace(obj: &Object) -> &str {
    metadata_str(obj, "namespace")
}

/// `Kind` for the core group, `Kind.group` otherwise.
pub fn group_kind(obj: &Object) -> String {
    let (group, _) = split_group_version(api_version(obj));
    let kind = kind(obj);
    if group.is_empty() {
        kind.to_string()
    } else {
        format!("{kind}.{group}")
    }
}

/// Fill in `apiVersion` and `kind` when a list item came back without them.
/// The two keys are placed first, where the API server puts them.
pub fn with_type_meta(obj: Object, resource: &ResourceIdentity) -> Object {
    if !api_version(&obj).is_empty() && !kind(&obj).is_empty() {
        return obj;
    }
    let mut typed = Map::with_capacity(obj.len() + 2);
    typed.insert("apiVersion".into(), Value::String(resource.api_version()));
    typed.insert("kind".into(), Value::String(resource.kind.clone()));
    for (key, value) in obj {
        match key.as_str() {
            "apiVersion" | "kind" if value.as_str().is_some_and(|s| !s.is_empty()) => {
                typed.insert(key, value);
            }
            "apiVersion" | "kind" => {}
            _ => {
                typed.insert(key, value);
            }
        }
    }
    typed
}
