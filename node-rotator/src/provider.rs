use async_trait::async_trait;

use super::*;

/// Adds compute capacity before a rotation and removes the drained nodes after it.
///
/// Both operations are sized in nodes, treat `0` as a no-op and may block while
/// the provider settles.
#[async_trait]
pub trait CapacityProvider: Send {
    fn name(&self) -> &str;

    async fn expand_for_rotation(&mut self, count: usize) -> Result<(), ProviderError>;

    /// Excludes `node` from the capacity removed by `shrink_after_rotation`.
    /// Called for every node the rotation could not drain.
    fn keep_node(&mut self, _node: &str) {}

    async fn shrink_after_rotation(&mut self, count: usize) -> Result<(), ProviderError>;
}

/// Provider for clusters whose nodes are added and removed by their operator.
/// It only tells the operator what to do.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfManagedProvider;

impl SelfManagedProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CapacityProvider for SelfManagedProvider {
    fn name(&self) -> &str {
        "self-managed"
    }

    async fn expand_for_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        if count > 0 {
            tracing::info!(count, "Cluster needs additional nodes before rotation");
            tracing::info!("Leaving provisioning to the cluster operator");
        }
        Ok(())
    }

    async fn shrink_after_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        if count > 0 {
            tracing::info!(count, "Rotated nodes are ready to be removed");
            tracing::info!("Leaving termination to the cluster operator");
        }
        Ok(())
    }
}
