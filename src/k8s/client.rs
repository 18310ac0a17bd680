use anyhow::{Context, Result};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client,
};

/// Build a kube::Client.
///
/// With neither a kubeconfig path nor a context, falls back to kube's
/// inference: $KUBECONFIG or ~/.kube/config, then the in-cluster service
/// account.
pub async fn build_client(kubeconfig: Option<&str>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let config = match (kubeconfig, context) {
        (Some(path), _) => {
            let kc = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig '{path}'"))?;
            kube::Config::from_custom_kubeconfig(kc, &options)
                .await
                .with_context(|| format!("Failed to load kubeconfig '{path}'"))?
        }
        (None, Some(ctx)) => kube::Config::from_kubeconfig(&options)
            .await
            .with_context(|| format!("Failed to load kubeconfig context '{ctx}'"))?,
        (None, None) => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes config")?,
    };

    Client::try_from(config).context("Failed to build Kubernetes client")
}

/// Return the current context name from kubeconfig (for diagnostics).
pub fn current_context() -> String {
    Kubeconfig::read()
        .ok()
        .and_then(|cfg| cfg.current_context)
        .unwrap_or_else(|| "unknown".to_string())
}
