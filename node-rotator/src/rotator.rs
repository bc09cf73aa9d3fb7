use k8s::NodeExt as _;

use super::*;

const EVICTION_GRACE_SECONDS: u64 = 60;
const DRAIN_SETTLE_SECONDS: u64 = 60;
const DRY_RUN_DRAIN_SETTLE_SECONDS: u64 = 5;

#[derive(Clone, Debug)]
pub struct RotatorConfig {
    pub policy: RotationPolicy,
    /// Skip every mutating cluster call while keeping narration and waits.
    pub dry_run: bool,
    pub eviction_grace_period: Duration,
    /// Wait between issuing evictions and the final forced drain.
    pub drain_settle: Duration,
}

impl RotatorConfig {
    pub fn new(policy: impl Into<RotationPolicy>, dry_run: bool) -> Self {
        let drain_settle = if dry_run {
            DRY_RUN_DRAIN_SETTLE_SECONDS.std_seconds()
        } else {
            DRAIN_SETTLE_SECONDS.std_seconds()
        };
        Self {
            policy: policy.into(),
            dry_run,
            eviction_grace_period: EVICTION_GRACE_SECONDS.std_seconds(),
            drain_settle,
        }
    }

    pub fn drain_settle(self, drain_settle: Duration) -> Self {
        Self {
            drain_settle,
            ..self
        }
    }

    pub fn eviction_grace_period(self, eviction_grace_period: Duration) -> Self {
        Self {
            eviction_grace_period,
            ..self
        }
    }
}

/// Finds aged nodes and evacuates them one at a time.
///
/// Each node goes through `Discovered → Cordoned → Draining → Drained`. A node
/// that cannot be cordoned stays `Discovered` and the batch moves on; only
/// failures to query the cluster abort a pass.
#[derive(Debug)]
pub struct NodeRotator<C> {
    cluster: C,
    config: RotatorConfig,
}

impl<C: ClusterApi> NodeRotator<C> {
    pub fn new(cluster: C, config: RotatorConfig) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &RotatorConfig {
        &self.config
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub async fn scan(&self) -> Result<RotationSet> {
        self.scan_at(Timestamp::now()).await
    }

    /// Lists all nodes and keeps those eligible under the policy at `now`.
    pub async fn scan_at(&self, now: Timestamp) -> Result<RotationSet> {
        let nodes = self
            .cluster
            .list_nodes()
            .await
            .map_err(Error::ClusterQuery)?;
        tracing::debug!(total = nodes.len(), "Listed cluster nodes");

        let set = nodes
            .iter()
            .filter_map(RotatableNode::from_node)
            .filter(|node| self.config.policy.is_eligible(node, now))
            .inspect(|node| {
                tracing::info!(
                    node = node.name(),
                    since = %node.created(),
                    "Adding node to rotation list"
                );
            })
            .collect::<RotationSet>();

        tracing::info!(count = set.len(), "Nodes collected for rotation");
        Ok(set)
    }

    pub async fn rotate(&self, set: &RotationSet) -> Result<RotationReport> {
        let mut report = RotationReport::new(self.config.dry_run);
        for node in set {
            let outcome = self.rotate_node(node).await?;
            report.push(outcome);
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Rotation pass finished"
        );
        Ok(report)
    }

    async fn rotate_node(&self, node: &RotatableNode) -> Result<NodeReport> {
        transition(node, NodeState::Discovered);
        if let Err(err) = self.cordon(node).await {
            tracing::warn!(node = node.name(), %err, "Leaving node for manual follow-up");
            return Ok(NodeReport::cordon_failed(node, &err));
        }
        transition(node, NodeState::Cordoned);

        transition(node, NodeState::Draining);
        let (evicted, mut failed_pods) = self.evict_workloads(node).await?;
        self.settle(node).await;
        failed_pods.extend(self.force_drain(node).await?);
        failed_pods.sort();
        failed_pods.dedup();
        transition(node, NodeState::Drained);

        // Termination belongs to the capacity provider, not the cluster.
        tracing::info!(node = node.name(), "Node released for termination");
        Ok(NodeReport::drained(node, evicted, failed_pods))
    }

    async fn cordon(&self, node: &RotatableNode) -> Result<(), NodeError> {
        let name = node.name();
        tracing::info!(node = name, "Cordoning node");

        if !self.config.dry_run {
            let cordon_failed = |reason: String| NodeError::CordonFailed {
                node: name.to_string(),
                reason,
            };
            let patched = self
                .cluster
                .cordon_node(name)
                .await
                .map_err(|err| cordon_failed(err.to_string()))?;
            if !patched.is_unschedulable() {
                return Err(cordon_failed(
                    "node is still schedulable after patch".to_string(),
                ));
            }
        }

        tracing::info!(node = name, "Node cordoned");
        Ok(())
    }

    /// Issues one eviction per pod on the node. Returns the number of evictions
    /// issued and the pods whose eviction failed.
    async fn evict_workloads(&self, node: &RotatableNode) -> Result<(usize, Vec<String>)> {
        let name = node.name();
        tracing::info!(node = name, "Collecting pods to evict");
        let pods = self.pods_on_node(name).await?;
        tracing::info!(node = name, count = pods.len(), "Pods will be evicted from node");

        let grace_period = self.config.eviction_grace_period;
        let mut evicted = 0;
        let mut failed = Vec::new();
        for (namespace, pod) in &pods {
            tracing::debug!(node = name, namespace, pod, "Evicting pod");
            if self.config.dry_run {
                evicted += 1;
                continue;
            }

            let eviction = self.cluster.evict_pod(namespace, pod, grace_period).await;
            match eviction {
                Ok(()) => evicted += 1,
                Err(source) => {
                    let err = NodeError::EvictionFailed {
                        namespace: namespace.clone(),
                        pod: pod.clone(),
                        source,
                    };
                    tracing::warn!(node = name, %err, "Continuing with remaining pods");
                    failed.push(format!("{namespace}/{pod}"));
                }
            }
        }

        Ok((evicted, failed))
    }

    /// `(namespace, pod)` for every pod scheduled on `node`, across all namespaces.
    async fn pods_on_node(&self, node: &str) -> Result<Vec<(String, String)>> {
        let namespaces = self
            .cluster
            .list_namespaces()
            .await
            .map_err(Error::ClusterQuery)?;

        let mut pods = Vec::new();
        for namespace in namespaces {
            let listed = self
                .cluster
                .list_pods_on_node(&namespace, node)
                .await
                .map_err(Error::ClusterQuery)?;
            pods.extend(listed.into_iter().filter_map(|pod| {
                let name = pod.metadata.name?;
                let namespace = pod.metadata.namespace.unwrap_or_else(|| namespace.clone());
                Some((namespace, name))
            }));
        }

        Ok(pods)
    }

    async fn settle(&self, node: &RotatableNode) {
        let wait = self.config.drain_settle;
        tracing::info!(node = node.name(), ?wait, "Waiting before final drain");
        tokio::time::sleep(wait).await;
    }

    async fn force_drain(&self, node: &RotatableNode) -> Result<Vec<String>> {
        let name = node.name();
        tracing::info!(node = name, "Issuing forced drain for the final pass");
        if self.config.dry_run {
            return Ok(Vec::new());
        }

        let remaining = self
            .cluster
            .force_drain_node(name)
            .await
            .map_err(Error::ClusterQuery)?;
        if !remaining.is_empty() {
            tracing::warn!(node = name, ?remaining, "Pods left behind by forced drain");
        }
        Ok(remaining)
    }
}

fn transition(node: &RotatableNode, state: NodeState) {
    tracing::info!(node = node.name(), %state, "Node state");
}

#[cfg(test)]
mod tests;
