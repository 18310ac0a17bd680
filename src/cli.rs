use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clap_complete::Shell;

use crate::config::FileConfig;
use crate::discovery::{IgnorePattern, DEFAULT_CHUNK_SIZE};

#[derive(Parser, Debug)]
#[command(
    name = "kubedump",
    about = "Dump every object of every resource type in a Kubernetes cluster",
    version
)]
pub struct Args {
    /// Directory to dump objects into. Omit to stream JSON lists to stdout.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Objects requested per list call. Default: 500.
    #[arg(
        long,
        visible_alias = "batch-size",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub chunk_size: Option<u32>,

    /// Resource that must exist in the cluster, as `resource.group` or bare
    /// `resource` for the core group (e.g. `namespaces`,
    /// `clusterroles.rbac.authorization.k8s.io`). Repeatable.
    #[arg(long, value_name = "RESOURCE")]
    pub must_exist: Vec<String>,

    /// Resource to skip, as a regex matched against the whole
    /// `resource.group` key (anchored). Repeatable.
    #[arg(long, value_name = "REGEX")]
    pub ignore: Vec<IgnorePattern>,

    /// Path to kubeconfig file. Defaults to $KUBECONFIG or ~/.kube/config,
    /// then the in-cluster service account.
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<String>,

    /// Use a specific kubeconfig context instead of the current one.
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Abort in-flight calls after this many seconds. Resource types not yet
    /// dumped are reported as failed.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Config file. Defaults to ~/.config/kubedump/config.toml when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not print the discovered resources and skipped types to stderr.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print shell completions for SHELL to stdout and exit.
    #[arg(long, value_name = "SHELL", hide = true)]
    pub completions: Option<Shell>,

    /// Print the man page to stdout and exit.
    #[arg(long, hide = true)]
    pub mangen: bool,
}

/// Effective run settings after merging the config file and the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dir: Option<PathBuf>,
    pub chunk_size: u32,
    pub must_exist: BTreeSet<String>,
    pub ignore: Vec<IgnorePattern>,
}

impl Args {
    pub fn settings(&self, file: FileConfig) -> Result<Settings> {
        let mut ignore = file
            .ignore
            .iter()
            .map(|p| {
                IgnorePattern::new(p).with_context(|| format!("invalid ignore pattern {p:?} in config file"))
            })
            .collect::<Result<Vec<_>>>()?;
        ignore.extend(self.ignore.iter().cloned());

        let must_exist = file
            .must_exist
            .into_iter()
            .chain(self.must_exist.iter().cloned())
            .collect();

        Ok(Settings {
            dir: self.dir.clone().or(file.dir),
            chunk_size: self
                .chunk_size
                .or(file.chunk_size)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            must_exist,
            ignore,
        })
    }
}
