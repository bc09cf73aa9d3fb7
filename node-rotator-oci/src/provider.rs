use super::*;

const PROVISION_WAIT_SECONDS: u64 = 60;

/// Capacity provider backed by a managed container engine node pool.
///
/// Expansion resizes the pool in one call. Shrinking deletes the rotated nodes
/// one by one, newest entry of the rotation set first, so that exactly the
/// drained instances are terminated.
#[derive(Debug)]
pub struct ManagedClusterProvider<E> {
    engine: E,
    config: ProviderConfig,
    nodes: Vec<RotatableNode>,
    provision_wait: Duration,
    dry_run: bool,
}

impl<E: ContainerEngine> ManagedClusterProvider<E> {
    pub fn new(engine: E, config: ProviderConfig, set: &RotationSet) -> Self {
        Self {
            engine,
            config,
            nodes: set.to_vec(),
            provision_wait: PROVISION_WAIT_SECONDS.std_seconds(),
            dry_run: false,
        }
    }

    /// Time to wait after every capacity change. The engine resizes pools
    /// asynchronously and there is no readiness check.
    pub fn provision_wait(self, provision_wait: Duration) -> Self {
        Self {
            provision_wait,
            ..self
        }
    }

    pub fn dry_run(self, dry_run: bool) -> Self {
        Self { dry_run, ..self }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Nodes not yet handed to the engine for termination.
    pub fn remaining(&self) -> &[RotatableNode] {
        &self.nodes
    }

    async fn node_pool(&self) -> Result<NodePoolSummary, ProviderError> {
        let pools = self
            .engine
            .list_node_pools(self.config.compartment_id(), self.config.cluster_id())
            .await?
            .into_result("list node pools")?;

        let pool = pools
            .into_iter()
            .find(|pool| pool.name.starts_with(NODE_POOL_FILTER))
            .ok_or_else(|| ProviderError::NoMatchingPool {
                filter: NODE_POOL_FILTER.to_string(),
            })?;

        tracing::info!(pool = %pool.name, size = pool.size(), "Processing node pool");
        Ok(pool)
    }

    async fn settle(&self, operation: &str) {
        let wait = self.provision_wait;
        tracing::info!(?wait, "Waiting for {operation} operation to finalize");
        tokio::time::sleep(wait).await;
    }
}

#[async_trait]
impl<E: ContainerEngine> CapacityProvider for ManagedClusterProvider<E> {
    fn name(&self) -> &str {
        "oci"
    }

    async fn expand_for_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        if count == 0 {
            return Ok(());
        }

        let delta = pool_delta(count)?;
        let pool = self.node_pool().await?;
        let target = pool.size().saturating_add(delta);
        tracing::info!(pool = %pool.name, from = pool.size(), to = target, "Scaling up node pool");

        if !self.dry_run {
            self.engine
                .update_node_pool_size(&pool.id, target)
                .await?
                .into_result("update node pool")?;
        }

        self.settle("provision").await;
        Ok(())
    }

    fn keep_node(&mut self, node: &str) {
        self.nodes.retain(|candidate| candidate.name() != node);
    }

    async fn shrink_after_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        if count == 0 {
            return Ok(());
        }

        let pool = self.node_pool().await?;
        let mut removed = 0;
        while removed < count {
            let Some(node) = self.nodes.pop() else {
                break;
            };
            let node_id = node
                .provider_id()
                .ok_or_else(|| ProviderError::MissingInstanceId {
                    node: node.name().to_string(),
                })?;

            tracing::info!(node = node.name(), instance = node_id, "Terminating node");
            if !self.dry_run {
                self.engine
                    .delete_node(&pool.id, node_id)
                    .await?
                    .into_result("delete node")?;
            }
            removed += 1;
        }

        self.settle("scale down").await;
        let size = pool.size().saturating_sub(pool_delta(removed)?);
        tracing::info!(pool = %pool.name, size, removed, "Scaled down node pool");
        if removed < count {
            tracing::warn!(
                pool = %pool.name,
                extra = count - removed,
                "Node pool left larger than before rotation"
            );
        }
        Ok(())
    }
}

fn pool_delta(count: usize) -> Result<u32, ProviderError> {
    u32::try_from(count).map_err(|_| {
        ProviderError::configuration(format!("cannot resize a node pool by {count} nodes"))
    })
}
