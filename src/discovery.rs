//! Discover every listable resource type and dump all of its objects.
//!
//! The run is strictly sequential: catalog, must-exist check, then each
//! eligible resource type page by page. Per-type failures are collected and
//! reported after the whole catalog has been walked.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dumper::Sink;
use crate::error::{BoxError, Cancelled, DumpError, FailureSet, ResourceFailure};
use crate::k8s::catalog::{Catalog, CatalogEntry};
use crate::k8s::cluster::{Cluster, PageRequest};

pub const DEFAULT_CHUNK_SIZE: u32 = 500;

/// An ignore pattern, anchored so it must match the whole comparable key.
#[derive(Debug, Clone)]
pub struct IgnorePattern {
    regex: Regex,
}

impl IgnorePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{pattern})$")).map(|regex| Self { regex })
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Display for IgnorePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IgnorePattern {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

pub struct DiscoveryOptions {
    /// Objects per list call. Zero means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: u32,

    /// Human-readable progress: the discovered tree and every skipped resource.
    pub log_writer: Box<dyn Write + Send>,

    /// Comparable keys (`resource.group` or `resource`) that must be in the
    /// catalog, as a sanity check that discovery is working. Empty requires
    /// nothing.
    pub must_exist: BTreeSet<String>,

    /// Checked in order; the first match skips the resource type.
    pub ignore: Vec<IgnorePattern>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_writer: Box::new(io::sink()),
            must_exist: BTreeSet::new(),
            ignore: Vec::new(),
        }
    }
}

impl fmt::Debug for DiscoveryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryOptions")
            .field("chunk_size", &self.chunk_size)
            .field("must_exist", &self.must_exist)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

impl DiscoveryOptions {
    pub fn chunk_size(&self) -> u32 {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

/// Why a resource type is not enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoListVerb,
    IgnoredByPattern(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoListVerb => f.write_str("no-list-verb"),
            Self::IgnoredByPattern(p) => write!(f, "ignored-by-pattern:{p}"),
        }
    }
}

/// `None` when the resource type should be listed.
pub fn skip_reason(entry: &CatalogEntry, ignore: &[IgnorePattern]) -> Option<SkipReason> {
    if !entry.capability.supports("list") {
        return Some(SkipReason::NoListVerb);
    }
    let key = entry.identity.comparable_key();
    ignore
        .iter()
        .find(|p| p.is_match(&key))
        .map(|p| SkipReason::IgnoredByPattern(p.as_str().to_string()))
}

/// Must-exist keys absent from the catalog, sorted. Skipped resource types
/// still count as present.
pub fn missing_resources(catalog: &Catalog, must_exist: &BTreeSet<String>) -> Vec<String> {
    if must_exist.is_empty() {
        return Vec::new();
    }
    let have = catalog.comparable_keys();
    must_exist.difference(&have).cloned().collect()
}

/// Dump every object of every listable resource type into `sink`.
///
/// The sink may be called several times for the same kind and may receive
/// duplicates; some API servers do not implement list chunking correctly.
pub async fn discover_objects<C, S>(
    cluster: &C,
    sink: &mut S,
    mut opts: DiscoveryOptions,
    cancel: &CancellationToken,
) -> Result<(), DumpError>
where
    C: Cluster + ?Sized,
    S: Sink + ?Sized,
{
    let chunk_size = opts.chunk_size();
    let log = &mut opts.log_writer;

    let catalog = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DumpError::DiscoveryUnavailable(Cancelled.into())),
        res = cluster.discover() => res.map_err(|e| DumpError::DiscoveryUnavailable(e.into())),
    }?;
    info!(resources = catalog.len(), groups = catalog.groups().len(), "discovered resources");
    let _ = catalog.write_tree(&mut **log);

    let missing = missing_resources(&catalog, &opts.must_exist);
    if !missing.is_empty() {
        warn!(?missing, "required resources not served by the cluster");
        return Err(DumpError::UnsatisfiedRequirement(missing));
    }

    let mut failures = FailureSet::new();
    for entry in catalog.entries() {
        if let Some(reason) = skip_reason(entry, &opts.ignore) {
            debug!(resource = %entry.identity, %reason, "skipping");
            let _ = writeln!(log, "skipping {}: {reason}", entry.identity);
            continue;
        }
        dump_resource(cluster, sink, entry, chunk_size, cancel, &mut failures).await;
    }

    if !failures.is_empty() {
        warn!(failed = failures.len(), "some resources could not be dumped");
    }
    failures.into_result()
}

/// Walk one resource type until the server returns an empty continue token
/// or a list call fails.
async fn dump_resource<C, S>(
    cluster: &C,
    sink: &mut S,
    entry: &CatalogEntry,
    chunk_size: u32,
    cancel: &CancellationToken,
    failures: &mut FailureSet,
) where
    C: Cluster + ?Sized,
    S: Sink + ?Sized,
{
    let resource = &entry.identity;
    let mut request = PageRequest::first(chunk_size);
    let mut pages = 0usize;

    loop {
        let result: Result<_, BoxError> = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(BoxError::from(Cancelled)),
            res = cluster.list_page(resource, &request) => res.map_err(Into::into),
        };
        let page = match result {
            Ok(page) => page,
            Err(source) => {
                warn!(%resource, error = %source, "list failed");
                failures.push(ResourceFailure::List {
                    resource: resource.clone(),
                    source,
                });
                return;
            }
        };

        pages += 1;
        if let Err(e) = sink.deliver(&page) {
            warn!(%resource, page = pages, error = %e, "sink rejected page");
            failures.push(ResourceFailure::Delivery {
                resource: resource.clone(),
                source: e.into(),
            });
        }

        if page.is_last() {
            break;
        }
        request = PageRequest::next(chunk_size, page.continue_token);
    }

    debug!(%resource, pages, "resource done");
}
