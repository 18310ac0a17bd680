//! Tests for kubedump::k8s::catalog and the pure filter/validator functions.

use std::collections::BTreeSet;

use kubedump::discovery::{missing_resources, skip_reason, IgnorePattern, SkipReason};
use kubedump::k8s::catalog::{
    split_group_version, Catalog, CatalogEntry, GroupResources, ResourceCapability, ResourceIdentity,
};

fn entry(group_version: &str, resource: &str, kind: &str, verbs: &[&str]) -> CatalogEntry {
    let mut group = GroupResources::new(group_version).with_resource(
        resource,
        kind,
        ResourceCapability::new(verbs.iter().copied(), true),
    );
    group.resources.remove(0)
}

// ── ResourceIdentity ──────────────────────────────────────────────────────────

#[test]
fn comparable_key_core_group_is_bare_resource() {
    let id = ResourceIdentity::new("", "v1", "namespaces", "Namespace");
    assert_eq!(id.comparable_key(), "namespaces");
    assert_eq!(id.api_version(), "v1");
}

#[test]
fn comparable_key_named_group_appends_group() {
    let id = ResourceIdentity::new("rbac.authorization.k8s.io", "v1", "clusterroles", "ClusterRole");
    assert_eq!(id.comparable_key(), "clusterroles.rbac.authorization.k8s.io");
    assert_eq!(id.api_version(), "rbac.authorization.k8s.io/v1");
}

#[test]
fn comparable_key_ignores_version() {
    let v1 = ResourceIdentity::new("autoscaling", "v1", "horizontalpodautoscalers", "HorizontalPodAutoscaler");
    let v2 = ResourceIdentity::new("autoscaling", "v2", "horizontalpodautoscalers", "HorizontalPodAutoscaler");
    assert_ne!(v1, v2);
    assert_eq!(v1.comparable_key(), v2.comparable_key());
}

#[test]
fn identity_equality_ignores_kind() {
    let a = ResourceIdentity::new("apps", "v1", "deployments", "Deployment");
    let b = ResourceIdentity::new("apps", "v1", "deployments", "Whatever");
    assert_eq!(a, b);
}

#[test]
fn identity_display_matches_group_version_resource() {
    let core = ResourceIdentity::new("", "v1", "pods", "Pod");
    assert_eq!(core.to_string(), "/v1, Resource=pods");
    let apps = ResourceIdentity::new("apps", "v1", "deployments", "Deployment");
    assert_eq!(apps.to_string(), "apps/v1, Resource=deployments");
}

#[test]
fn split_group_version_core_and_named() {
    assert_eq!(split_group_version("v1"), ("", "v1"));
    assert_eq!(
        split_group_version("rbac.authorization.k8s.io/v1"),
        ("rbac.authorization.k8s.io", "v1")
    );
}

// ── Catalog ───────────────────────────────────────────────────────────────────

#[test]
fn catalog_entries_keep_server_order() {
    let catalog = Catalog::new(vec![
        GroupResources::new("v1")
            .with_resource("pods", "Pod", ResourceCapability::default())
            .with_resource("configmaps", "ConfigMap", ResourceCapability::default()),
        GroupResources::new("apps/v1").with_resource("deployments", "Deployment", ResourceCapability::default()),
    ]);
    let order: Vec<String> = catalog.entries().map(|e| e.identity.comparable_key()).collect();
    assert_eq!(order, vec!["pods", "configmaps", "deployments.apps"]);
    assert_eq!(catalog.len(), 3);
    assert!(!catalog.is_empty());
}

#[test]
fn catalog_tree_lists_kinds_under_group_versions() {
    let catalog = Catalog::new(vec![
        GroupResources::new("v1").with_resource("namespaces", "Namespace", ResourceCapability::default()),
        GroupResources::new("apps/v1").with_resource("deployments", "Deployment", ResourceCapability::default()),
    ]);
    let mut out = Vec::new();
    catalog.write_tree(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Discovered resources:\nv1\n  Namespace\napps/v1\n  Deployment\n"
    );
}

#[test]
fn capability_supports_exact_verbs_only() {
    let caps = ResourceCapability::new(["get", "watch", "listall"], false);
    assert!(caps.supports("get"));
    assert!(!caps.supports("list"));
}

// ── Filter ────────────────────────────────────────────────────────────────────

#[test]
fn skip_without_list_verb_even_if_ignored() {
    let e = entry("v1", "bindings", "Binding", &["create"]);
    let ignore = vec![IgnorePattern::new("bindings").unwrap()];
    assert_eq!(skip_reason(&e, &ignore), Some(SkipReason::NoListVerb));
}

#[test]
fn first_matching_pattern_wins() {
    let e = entry("apps/v1", "deployments", "Deployment", &["list"]);
    let ignore = vec![
        IgnorePattern::new("pods").unwrap(),
        IgnorePattern::new(r"deployments\.apps").unwrap(),
        IgnorePattern::new(".*").unwrap(),
    ];
    assert_eq!(
        skip_reason(&e, &ignore),
        Some(SkipReason::IgnoredByPattern(r"^(?:deployments\.apps)$".to_string()))
    );
}

#[test]
fn listable_and_unmatched_is_eligible() {
    let e = entry("apps/v1", "deployments", "Deployment", &["get", "list"]);
    let ignore = vec![IgnorePattern::new("deployments").unwrap()];
    assert_eq!(skip_reason(&e, &ignore), None);
}

#[test]
fn skip_reason_display() {
    assert_eq!(SkipReason::NoListVerb.to_string(), "no-list-verb");
    assert_eq!(
        SkipReason::IgnoredByPattern("^(?:events)$".into()).to_string(),
        "ignored-by-pattern:^(?:events)$"
    );
}

// ── IgnorePattern ─────────────────────────────────────────────────────────────

#[test]
fn ignore_pattern_is_anchored() {
    let p = IgnorePattern::new(r"roles\.rbac\.authorization\.k8s\.io").unwrap();
    assert!(p.is_match("roles.rbac.authorization.k8s.io"));
    assert!(!p.is_match("clusterroles.rbac.authorization.k8s.io"));
    assert!(!p.is_match("roles.rbac.authorization.k8s.io.example.com"));
}

#[test]
fn ignore_pattern_alternation_is_anchored_as_a_whole() {
    let p = IgnorePattern::new("events|pods").unwrap();
    assert!(p.is_match("events"));
    assert!(p.is_match("pods"));
    assert!(!p.is_match("events.events.k8s.io"));
    assert!(!p.is_match("mypods"));
}

#[test]
fn ignore_pattern_rejects_invalid_regex() {
    assert!(IgnorePattern::new("(unclosed").is_err());
    assert!("[z-a]".parse::<IgnorePattern>().is_err());
}

// ── Validator ─────────────────────────────────────────────────────────────────

#[test]
fn missing_resources_is_sorted_set_difference() {
    let catalog = Catalog::new(vec![
        GroupResources::new("v1").with_resource("namespaces", "Namespace", ResourceCapability::default()),
        GroupResources::new("rbac.authorization.k8s.io/v1").with_resource(
            "clusterroles",
            "ClusterRole",
            ResourceCapability::default(),
        ),
    ]);
    let want: BTreeSet<String> = [
        "namespaces",
        "widgets.example.com",
        "clusterroles.rbac.authorization.k8s.io",
        "fluxcapacitors.spaceship.io",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    assert_eq!(
        missing_resources(&catalog, &want),
        vec!["fluxcapacitors.spaceship.io", "widgets.example.com"]
    );
}

#[test]
fn empty_must_exist_always_passes() {
    assert!(missing_resources(&Catalog::default(), &BTreeSet::new()).is_empty());
}

#[test]
fn must_exist_does_not_match_with_version() {
    let catalog = Catalog::new(vec![GroupResources::new("apps/v1").with_resource(
        "deployments",
        "Deployment",
        ResourceCapability::default(),
    )]);
    let want: BTreeSet<String> = ["deployments.apps/v1".to_string()].into();
    assert_eq!(missing_resources(&catalog, &want), vec!["deployments.apps/v1"]);
}

// ── Discovery documents ───────────────────────────────────────────────────────

#[test]
fn catalog_group_skips_subresources() {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
    use kubedump::k8s::cluster::catalog_group;

    let resource = |name: &str, kind: &str, verbs: &[&str], namespaced: bool| APIResource {
        name: name.to_string(),
        kind: kind.to_string(),
        namespaced,
        verbs: verbs.iter().map(|v| (*v).to_string()).collect(),
        ..Default::default()
    };
    let list = APIResourceList {
        group_version: "apps/v1".to_string(),
        resources: vec![
            resource("deployments", "Deployment", &["get", "list"], true),
            resource("deployments/scale", "Scale", &["get", "update"], true),
            resource("controllerrevisions", "ControllerRevision", &["list"], true),
        ],
    };

    let group = catalog_group(list);
    assert_eq!(group.group_version, "apps/v1");
    let ids: Vec<&ResourceIdentity> = group.resources.iter().map(|e| &e.identity).collect();
    assert_eq!(
        ids,
        vec![
            &ResourceIdentity::new("apps", "v1", "deployments", "Deployment"),
            &ResourceIdentity::new("apps", "v1", "controllerrevisions", "ControllerRevision"),
        ]
    );
    assert!(group.resources[0].capability.supports("list"));
    assert!(group.resources[0].capability.namespaced);
}
