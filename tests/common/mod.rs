//! In-memory cluster shared by the discovery tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kubedump::k8s::catalog::{Catalog, GroupResources, ResourceCapability, ResourceIdentity};
use kubedump::k8s::cluster::{Cluster, PageRequest};
use kubedump::objects::{Object, Page};
use serde_json::json;

pub fn obj(api_version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Object {
    let mut metadata = json!({ "name": name });
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    let value = json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": metadata,
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn list_caps(namespaced: bool) -> ResourceCapability {
    ResourceCapability::new(["get", "list", "watch", "create", "delete"], namespaced)
}

#[derive(Default)]
pub struct FakeCluster {
    catalog: Catalog,
    objects: HashMap<String, Vec<Object>>,
    failing: HashSet<String>,
    discover_error: Option<String>,
    /// (comparable key, request) for every list call that reached the cluster.
    pub calls: Mutex<Vec<(String, PageRequest)>>,
}

impl FakeCluster {
    pub fn new(groups: Vec<GroupResources>) -> Self {
        Self {
            catalog: Catalog::new(groups),
            ..Default::default()
        }
    }

    /// Objects served for the resource with this comparable key.
    pub fn with_objects(mut self, key: &str, objects: Vec<Object>) -> Self {
        self.objects.insert(key.to_string(), objects);
        self
    }

    /// Every list call for this comparable key fails.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn unreachable(mut self, msg: &str) -> Self {
        self.discover_error = Some(msg.to_string());
        self
    }

    pub fn listed_keys(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn discover(&self) -> Result<Catalog> {
        match &self.discover_error {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(self.catalog.clone()),
        }
    }

    /// Continue tokens are the offset of the next item.
    async fn list_page(&self, resource: &ResourceIdentity, request: &PageRequest) -> Result<Page> {
        let key = resource.comparable_key();
        self.calls.lock().unwrap().push((key.clone(), request.clone()));

        if self.failing.contains(&key) {
            return Err(anyhow!("the server is currently unable to handle the request"));
        }

        let all = self.objects.get(&key).cloned().unwrap_or_default();
        let start: usize = if request.continue_token.is_empty() {
            0
        } else {
            request.continue_token.parse()?
        };
        let end = (start + request.limit as usize).min(all.len());
        let next = if end < all.len() { end.to_string() } else { String::new() };
        Ok(Page::new(resource.clone(), all[start..end].to_vec(), next))
    }
}

/// Diagnostic writer the test can read back after the run.
#[derive(Clone, Default)]
pub struct SharedLog(Arc<Mutex<Vec<u8>>>);

impl SharedLog {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
