//! kubedump library — discovery and paginated dumping of every resource type
//! a cluster serves. The binary is thin glue around [`discovery::discover_objects`];
//! the lib target also gives the integration tests in tests/ access to the
//! internals.
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,   // internal helpers; callers are the binary and tests
    clippy::missing_errors_doc,   // every fallible fn returns DumpError or anyhow context
)]

pub mod cli;
pub mod config;
pub mod discovery;
pub mod dumper;
pub mod error;
pub mod k8s;
pub mod objects;
