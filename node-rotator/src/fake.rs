use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s::metav1;
use k8s::ObjectMetaExt as _;
use k8s::TimeExt as _;

use super::*;

pub(crate) const COMPARTMENT: &str = "ocid1.compartment.oc1..rotation";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    ListNodes,
    ListNamespaces,
    ListPods { namespace: String, node: String },
    Cordon(String),
    Evict { namespace: String, pod: String, grace: Duration },
    ForceDrain(String),
    Expand(usize),
    Keep(String),
    Shrink(usize),
}

impl Call {
    pub(crate) fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Cordon(_) | Self::Evict { .. } | Self::ForceDrain(_)
        )
    }
}

/// Shared, ordered record of cluster and provider calls.
pub(crate) type Journal = Arc<Mutex<Vec<Call>>>;

#[derive(Debug)]
pub(crate) struct FakeCluster {
    nodes: Vec<corev1::Node>,
    namespaces: BTreeSet<String>,
    pods: Vec<corev1::Pod>,
    stuck_cordon: BTreeSet<String>,
    failing_evictions: BTreeSet<String>,
    drain_leftovers: BTreeMap<String, Vec<String>>,
    nodes_unreachable: bool,
    namespaces_unreachable: bool,
    journal: Journal,
}

impl FakeCluster {
    pub(crate) fn new() -> Self {
        let namespaces = ["default", "kube-system"]
            .into_iter()
            .map(ToString::to_string)
            .collect();
        Self {
            nodes: Vec::new(),
            namespaces,
            pods: Vec::new(),
            stuck_cordon: BTreeSet::new(),
            failing_evictions: BTreeSet::new(),
            drain_leftovers: BTreeMap::new(),
            nodes_unreachable: false,
            namespaces_unreachable: false,
            journal: Journal::default(),
        }
    }

    pub(crate) fn with_node(mut self, name: &str, age_days: i64) -> Self {
        self.nodes.push(node(name, age_days));
        self
    }

    pub(crate) fn with_pod(mut self, namespace: &str, name: &str, node: &str) -> Self {
        self.namespaces.insert(namespace.to_string());
        self.pods.push(pod(namespace, name, node));
        self
    }

    /// Patching this node succeeds but it keeps reading schedulable.
    pub(crate) fn with_stuck_cordon(mut self, node: &str) -> Self {
        self.stuck_cordon.insert(node.to_string());
        self
    }

    pub(crate) fn with_failing_eviction(mut self, pod: &str) -> Self {
        self.failing_evictions.insert(pod.to_string());
        self
    }

    pub(crate) fn with_drain_leftover(mut self, node: &str, pod: &str) -> Self {
        self.drain_leftovers
            .entry(node.to_string())
            .or_default()
            .push(pod.to_string());
        self
    }

    pub(crate) fn nodes_unreachable(mut self) -> Self {
        self.nodes_unreachable = true;
        self
    }

    pub(crate) fn namespaces_unreachable(mut self) -> Self {
        self.namespaces_unreachable = true;
        self
    }

    pub(crate) fn journal(&self) -> Journal {
        Arc::clone(&self.journal)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        let calls = self.journal.lock().unwrap();
        calls.clone()
    }

    pub(crate) fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutating)
            .collect()
    }

    fn record(&self, call: Call) {
        self.journal.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>> {
        self.record(Call::ListNodes);
        if self.nodes_unreachable {
            return Err(connection_refused());
        }
        Ok(self.nodes.clone())
    }

    async fn list_namespaces(&self) -> kube::Result<Vec<String>> {
        self.record(Call::ListNamespaces);
        if self.namespaces_unreachable {
            return Err(connection_refused());
        }
        Ok(self.namespaces.iter().cloned().collect())
    }

    async fn list_pods_on_node(
        &self,
        namespace: &str,
        node: &str,
    ) -> kube::Result<Vec<corev1::Pod>> {
        self.record(Call::ListPods {
            namespace: namespace.to_string(),
            node: node.to_string(),
        });
        let pods = self
            .pods
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .filter(|pod| {
                pod.spec.as_ref().and_then(|spec| spec.node_name.as_deref()) == Some(node)
            })
            .cloned()
            .collect();
        Ok(pods)
    }

    async fn cordon_node(&self, node: &str) -> kube::Result<corev1::Node> {
        self.record(Call::Cordon(node.to_string()));
        let mut patched = self
            .nodes
            .iter()
            .find(|candidate| candidate.metadata.name.as_deref() == Some(node))
            .cloned()
            .ok_or_else(|| api_error(format!("nodes \"{node}\" not found")))?;
        if !self.stuck_cordon.contains(node) {
            patched.spec.get_or_insert_with(k8s::default).unschedulable = Some(true);
        }
        Ok(patched)
    }

    async fn evict_pod(
        &self,
        namespace: &str,
        pod: &str,
        grace_period: Duration,
    ) -> kube::Result<()> {
        self.record(Call::Evict {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            grace: grace_period,
        });
        if self.failing_evictions.contains(pod) {
            return Err(api_error(format!(
                "cannot evict pod {pod} as it would violate the pod's disruption budget"
            )));
        }
        Ok(())
    }

    async fn force_drain_node(&self, node: &str) -> kube::Result<Vec<String>> {
        self.record(Call::ForceDrain(node.to_string()));
        Ok(self.drain_leftovers.get(node).cloned().unwrap_or_default())
    }
}

/// Records expand and shrink calls in the cluster journal.
#[derive(Debug)]
pub(crate) struct RecordingProvider {
    journal: Journal,
    fail_expand: bool,
}

impl RecordingProvider {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_expand: false,
        }
    }

    pub(crate) fn failing_expand(journal: Journal) -> Self {
        Self {
            journal,
            fail_expand: true,
        }
    }
}

#[async_trait]
impl CapacityProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn expand_for_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        self.journal.lock().unwrap().push(Call::Expand(count));
        if self.fail_expand {
            return Err(ProviderError::Call {
                operation: "update node pool",
                status: 409,
                message: "conflict".to_string(),
            });
        }
        Ok(())
    }

    fn keep_node(&mut self, node: &str) {
        self.journal.lock().unwrap().push(Call::Keep(node.to_string()));
    }

    async fn shrink_after_rotation(&mut self, count: usize) -> Result<(), ProviderError> {
        self.journal.lock().unwrap().push(Call::Shrink(count));
        Ok(())
    }
}

pub(crate) fn node(name: &str, age_days: i64) -> corev1::Node {
    corev1::Node {
        metadata: metav1::ObjectMeta::new(name)
            .created(metav1::Time::days_ago(age_days))
            .annotations([("oci.oraclecloud.com/compartment-id", COMPARTMENT)]),
        spec: Some(corev1::NodeSpec {
            provider_id: Some(format!("ocid1.instance.oc1..{name}")),
            ..k8s::default()
        }),
        ..k8s::default()
    }
}

pub(crate) fn pod(namespace: &str, name: &str, node: &str) -> corev1::Pod {
    corev1::Pod {
        metadata: metav1::ObjectMeta::with_namespace(name, namespace),
        spec: Some(corev1::PodSpec {
            node_name: Some(node.to_string()),
            ..k8s::default()
        }),
        ..k8s::default()
    }
}

fn api_error(message: String) -> kube::Error {
    kube::Error::ReadEvents(io::Error::other(message))
}

fn connection_refused() -> kube::Error {
    api_error("connection refused".to_string())
}
