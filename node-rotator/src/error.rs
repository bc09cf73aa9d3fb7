pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures that abort a rotation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cluster query failed: {0}")]
    ClusterQuery(#[source] kube::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failures of a capacity provider phase. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider configuration error: {0}")]
    Configuration(String),

    #[error("provider call '{operation}' failed with status {status}: {message}")]
    Call {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("no node pool name starts with '{filter}'")]
    NoMatchingPool { filter: String },

    #[error("node {node} has no provider instance id")]
    MissingInstanceId { node: String },

    #[error("provider request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    pub fn configuration(message: impl ToString) -> Self {
        Self::Configuration(message.to_string())
    }

    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Failures confined to a single node. Recorded in the rotation report,
/// never propagated.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("cordon of node {node} failed: {reason}")]
    CordonFailed { node: String, reason: String },

    #[error("eviction of pod {namespace}/{pod} failed: {source}")]
    EvictionFailed {
        namespace: String,
        pod: String,
        source: kube::Error,
    },
}
