use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

/// A resource type as advertised by discovery.
///
/// Two identities name the same resource type when group, version and
/// resource match; `kind` rides along for logging and list shaping.
#[derive(Debug, Clone, Eq)]
pub struct ResourceIdentity {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
}

impl ResourceIdentity {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            kind: kind.into(),
        }
    }

    /// `group/version`, or bare `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Version-less key used for must-exist and ignore matching:
    /// `resource.group`, or `resource` for the core group.
    pub fn comparable_key(&self) -> String {
        if self.group.is_empty() {
            self.resource.clone()
        } else {
            format!("{}.{}", self.resource, self.group)
        }
    }
}

impl PartialEq for ResourceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.version == other.version
            && self.resource == other.resource
    }
}

impl std::hash::Hash for ResourceIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.version.hash(state);
        self.resource.hash(state);
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, Resource={}", self.group, self.version, self.resource)
    }
}

/// Verbs and scope of a resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCapability {
    pub verbs: Vec<String>,
    pub namespaced: bool,
}

impl ResourceCapability {
    pub fn new<I, S>(verbs: I, namespaced: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verbs: verbs.into_iter().map(Into::into).collect(),
            namespaced,
        }
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identity: ResourceIdentity,
    pub capability: ResourceCapability,
}

/// All resources of one group-version, in the order the server listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResources {
    pub group_version: String,
    pub resources: Vec<CatalogEntry>,
}

impl GroupResources {
    pub fn new(group_version: impl Into<String>) -> Self {
        Self {
            group_version: group_version.into(),
            resources: Vec::new(),
        }
    }

    /// Add a resource, deriving group and version from `group_version`.
    pub fn with_resource(
        mut self,
        resource: impl Into<String>,
        kind: impl Into<String>,
        capability: ResourceCapability,
    ) -> Self {
        let (group, version) = split_group_version(&self.group_version);
        self.resources.push(CatalogEntry {
            identity: ResourceIdentity::new(group, version, resource, kind),
            capability,
        });
        self
    }
}

/// The server's preferred resources, captured once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    groups: Vec<GroupResources>,
}

impl Catalog {
    pub fn new(groups: Vec<GroupResources>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[GroupResources] {
        &self.groups
    }

    /// Every entry in enumeration order: group-version order, then resource order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.groups.iter().flat_map(|g| g.resources.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.resources.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn comparable_keys(&self) -> BTreeSet<String> {
        self.entries().map(|e| e.identity.comparable_key()).collect()
    }

    /// Human-readable tree of group-versions and their kinds.
    pub fn write_tree(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Discovered resources:")?;
        for group in &self.groups {
            writeln!(w, "{}", group.group_version)?;
            for entry in &group.resources {
                writeln!(w, "  {}", entry.identity.kind)?;
            }
        }
        Ok(())
    }
}

/// Split `apps/v1` into `("apps", "v1")` and `v1` into `("", "v1")`.
pub fn split_group_version(group_version: &str) -> (&str, &str) {
    match group_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", group_version),
    }
}

