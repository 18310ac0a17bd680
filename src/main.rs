use std::io;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use kubedump::{
    cli::{Args, Settings},
    config::FileConfig,
    discovery::{discover_objects, DiscoveryOptions},
    dumper::{DirDumper, Sink, WriterSink},
    k8s::{
        client::{build_client, current_context},
        cluster::KubeCluster,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

fn init_tracing() {
    let env = std::env::var("KUBEDUMP_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // stdout carries the dump itself
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "kubedump", &mut io::stdout());
        return ExitCode::SUCCESS;
    }
    if args.mangen {
        let man = clap_mangen::Man::new(Args::command());
        if let Err(e) = man.render(&mut io::stdout()) {
            eprintln!("[kubedump] failed to render man page: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    init_tracing();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("failed to dump some or all objects: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let settings = args.settings(FileConfig::load(args.config.as_deref())?)?;
    debug!(?settings, "effective settings");

    let cancel = CancellationToken::new();
    watch_for_cancel(&cancel, args.timeout);

    match &settings.dir {
        Some(dir) => {
            let mut dumper = DirDumper::new(dir).context("failed to create directory dumper")?;
            let result = dump(args, &settings, &mut dumper, &cancel).await;
            let closed = dumper.close().context("failed to close dump files");
            result?;
            closed
        }
        None => {
            let mut sink = WriterSink::new(io::stdout().lock());
            dump(args, &settings, &mut sink, &cancel).await
        }
    }
}

async fn dump<S: Sink>(
    args: &Args,
    settings: &Settings,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<()> {
    let client = build_client(args.kubeconfig.as_deref(), args.context.as_deref()).await?;
    info!(context = %args.context.clone().unwrap_or_else(current_context), "connected");

    let opts = DiscoveryOptions {
        chunk_size: settings.chunk_size,
        log_writer: if args.quiet {
            Box::new(io::sink())
        } else {
            Box::new(io::stderr())
        },
        must_exist: settings.must_exist.clone(),
        ignore: settings.ignore.clone(),
    };

    discover_objects(&KubeCluster::new(client), sink, opts, cancel).await?;
    Ok(())
}

/// Ctrl-C and the optional deadline both cancel the run.
fn watch_for_cancel(cancel: &CancellationToken, timeout: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("[kubedump] interrupted, aborting remaining list calls");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            eprintln!("[kubedump] timeout of {secs}s reached, aborting remaining list calls");
            on_deadline.cancel();
        });
    }
}
