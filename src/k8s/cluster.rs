use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams},
    Client,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::k8s::catalog::{Catalog, GroupResources, ResourceCapability, ResourceIdentity};
use crate::objects::{self, Object, Page};

/// Parameters for a single list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    /// Empty on the first call for a resource type.
    pub continue_token: String,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit,
            continue_token: String::new(),
        }
    }

    pub fn next(limit: u32, continue_token: impl Into<String>) -> Self {
        Self {
            limit,
            continue_token: continue_token.into(),
        }
    }
}

/// The two API server operations a dump needs.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Preferred version of every resource type, in server order.
    async fn discover(&self) -> Result<Catalog>;

    /// One page of objects across all namespaces.
    async fn list_page(&self, resource: &ResourceIdentity, request: &PageRequest) -> Result<Page>;
}

/// [`Cluster`] backed by a live API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn discover(&self) -> Result<Catalog> {
        let mut groups = Vec::new();

        // Core group first. /api names no preferred version, the first listed wins.
        let core = self
            .client
            .list_core_api_versions()
            .await
            .context("Failed to list core API versions")?;
        if let Some(preferred) = core.versions.first() {
            groups.extend(self.group_versions(&core.versions, preferred).await);
        }

        let api_groups = self
            .client
            .list_api_groups()
            .await
            .context("Failed to list API groups")?;
        for g in api_groups.groups {
            let versions: Vec<String> = g.versions.into_iter().map(|v| v.group_version).collect();
            let Some(preferred) = g
                .preferred_version
                .map(|v| v.group_version)
                .or_else(|| versions.first().cloned())
            else {
                warn!(group = %g.name, "API group advertises no versions");
                continue;
            };
            groups.extend(self.group_versions(&versions, &preferred).await);
        }

        Ok(Catalog::new(groups))
    }

    async fn list_page(&self, resource: &ResourceIdentity, request: &PageRequest) -> Result<Page> {
        let gvk = GroupVersionKind::gvk(&resource.group, &resource.version, &resource.kind);
        let ar = ApiResource::from_gvk_with_plural(&gvk, &resource.resource);
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &ar);

        let mut lp = ListParams::default().limit(request.limit);
        if !request.continue_token.is_empty() {
            lp = lp.continue_token(&request.continue_token);
        }

        let list = api.list(&lp).await?;
        let continue_token = list.metadata.continue_.unwrap_or_default();
        let items = list
            .items
            .into_iter()
            .map(|obj| to_object(obj, resource))
            .collect::<Result<Vec<_>>>()?;

        debug!(%resource, items = items.len(), more = !continue_token.is_empty(), "listed page");
        Ok(Page::new(resource.clone(), items, continue_token))
    }
}

impl KubeCluster {
    /// Every version of one API group, each resource kept once.
    async fn group_versions(&self, versions: &[String], preferred: &str) -> Vec<GroupResources> {
        let mut fetched = Vec::with_capacity(versions.len());
        for group_version in versions {
            if let Some(group) = self.group_resources(group_version).await {
                fetched.push(group);
            }
        }
        merge_versions(fetched, preferred)
    }

    /// Resources of one group-version. A failure here degrades the catalog
    /// instead of failing discovery.
    async fn group_resources(&self, group_version: &str) -> Option<GroupResources> {
        let result = if group_version.contains('/') {
            self.client.list_api_group_resources(group_version).await
        } else {
            self.client.list_core_api_resources(group_version).await
        };
        match result {
            Ok(list) => Some(catalog_group(list)),
            Err(e) => {
                warn!(%group_version, error = %e, "skipping unavailable group version");
                None
            }
        }
    }
}

/// Keep each resource name at `preferred` when that version serves it,
/// otherwise at the first version that does. Group-versions stay in server
/// order; non-preferred ones left with nothing are dropped.
fn merge_versions(fetched: Vec<GroupResources>, preferred: &str) -> Vec<GroupResources> {
    let mut claimed: HashSet<String> = fetched
        .iter()
        .filter(|g| g.group_version == preferred)
        .flat_map(|g| g.resources.iter().map(|e| e.identity.resource.clone()))
        .collect();

    let mut merged = Vec::with_capacity(fetched.len());
    for mut group in fetched {
        if group.group_version != preferred {
            group.resources.retain(|e| claimed.insert(e.identity.resource.clone()));
            if group.resources.is_empty() {
                continue;
            }
        }
        merged.push(group);
    }
    merged
}

/// Subresources (`pods/log`, `deployments/scale`) are not listable collections.
pub fn catalog_group(list: APIResourceList) -> GroupResources {
    let mut group = GroupResources::new(list.group_version);
    for r in list.resources {
        if r.name.contains('/') {
            continue;
        }
        group = group.with_resource(r.name, r.kind, ResourceCapability::new(r.verbs, r.namespaced));
    }
    group
}

fn to_object(obj: DynamicObject, resource: &ResourceIdentity) -> Result<Object> {
    match serde_json::to_value(obj).context("Failed to encode listed object")? {
        Value::Object(map) => Ok(objects::with_type_meta(map, resource)),
        other => anyhow::bail!("listed object is not a JSON object: {other}"),
    }
}
