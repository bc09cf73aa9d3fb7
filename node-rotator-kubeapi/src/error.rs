/// Failures constructing the cluster client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error(transparent)]
    Kube(#[from] kube::Error),
}
