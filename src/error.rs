//! Error types for a dump run.
//!
//! Only two conditions stop a run early: the catalog cannot be fetched, or a
//! must-exist resource is absent. Everything else is a [`ResourceFailure`]
//! collected into a [`FailureSet`] and reported once, after every resource
//! type has been attempted.

use std::fmt;

use thiserror::Error;

use crate::k8s::catalog::ResourceIdentity;

/// Boxed cause carried by failures; `anyhow::Error` converts into it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DumpError {
    /// The cause chain is part of the message, not a `source()`.
    #[error("failed to get server preferred resources: {}", chain(.0))]
    DiscoveryUnavailable(BoxError),

    #[error("missing resources: [{}]", .0.join(" "))]
    UnsatisfiedRequirement(Vec<String>),

    #[error("{0}")]
    Incomplete(FailureSet),
}

/// Which step of the enumeration loop failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    List,
    Delivery,
}

/// One failed list call or one rejected page, tagged with its resource type.
#[derive(Debug, Error)]
pub enum ResourceFailure {
    #[error("failed to list {resource}")]
    List {
        resource: ResourceIdentity,
        #[source]
        source: BoxError,
    },

    #[error("failed to dump {resource}")]
    Delivery {
        resource: ResourceIdentity,
        #[source]
        source: BoxError,
    },
}

impl ResourceFailure {
    pub fn resource(&self) -> &ResourceIdentity {
        match self {
            Self::List { resource, .. } | Self::Delivery { resource, .. } => resource,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::List { .. } => Phase::List,
            Self::Delivery { .. } => Phase::Delivery,
        }
    }
}

/// Accumulator threaded through a run. Nothing is ever dropped from it.
#[derive(Debug, Default)]
pub struct FailureSet {
    failures: Vec<ResourceFailure>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ResourceFailure) {
        self.failures.push(failure);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceFailure> {
        self.failures.iter()
    }

    /// `Ok(())` when nothing failed, otherwise the combined error.
    pub fn into_result(self) -> Result<(), DumpError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DumpError::Incomplete(self))
        }
    }
}

impl<'a> IntoIterator for &'a FailureSet {
    type Item = &'a ResourceFailure;
    type IntoIter = std::slice::Iter<'a, ResourceFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

impl fmt::Display for FailureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", Chain(failure))?;
        }
        Ok(())
    }
}

/// Several independent errors reported as one, `a; b; c`.
///
/// Used by sinks that keep going after a failed write and by
/// [`crate::dumper::DirDumper::close`].
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<BoxError>,
}

impl MultiError {
    pub fn push(&mut self, error: impl Into<BoxError>) {
        self.errors.push(error.into());
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", chain(e))?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

/// Cancellation of an in-flight cluster call.
#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// An error followed by each of its causes, `outer: inner: root`.
struct Chain<'a>(&'a (dyn std::error::Error + 'static));

fn chain(err: &BoxError) -> Chain<'_> {
    Chain(&**err)
}

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}
