use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use kube::api;
use kube::ResourceExt as _;
use node_rotator_ext as k8s;

use k8s::corev1;
use k8s::NodeExt as _;
use k8s::PodExt as _;

pub use error::Error;

mod error;

/// Operations the rotation engine needs from the cluster control plane.
///
/// Listing calls are read-only; `cordon_node`, `evict_pod` and `force_drain_node`
/// mutate cluster state.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>>;

    /// Names of all namespaces in the cluster.
    async fn list_namespaces(&self) -> kube::Result<Vec<String>>;

    /// Pods in `namespace` currently scheduled on `node`.
    async fn list_pods_on_node(&self, namespace: &str, node: &str)
        -> kube::Result<Vec<corev1::Pod>>;

    /// Marks `node` unschedulable and returns the node as stored after the patch.
    async fn cordon_node(&self, node: &str) -> kube::Result<corev1::Node>;

    async fn evict_pod(&self, namespace: &str, pod: &str, grace_period: Duration)
        -> kube::Result<()>;

    /// Deletes every pod still running on `node` except DaemonSet and mirror pods,
    /// local storage included. Returns the pods that could not be removed.
    async fn force_drain_node(&self, node: &str) -> kube::Result<Vec<String>>;
}

pub struct KubeApi {
    list_params: api::ListParams,
    patch_params: api::PatchParams,
    client: kube::Client,
}

impl KubeApi {
    /// Create a KubeApi for the given kubeconfig context, or for the current
    /// context (or in-cluster config) when `context` is `None`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), node_rotator_kubeapi::Error> {
    /// let api = node_rotator_kubeapi::KubeApi::new(Some("staging")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(context: Option<&str>) -> Result<Self, Error> {
        let client = match context {
            Some(context) => {
                let options = kube::config::KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..k8s::default()
                };
                let config = kube::Config::from_kubeconfig(&options).await?;
                kube::Client::try_from(config)?
            }
            None => kube::Client::try_default().await?,
        };
        Ok(Self::with_client(client))
    }

    /// Create a KubeApi backed by the provided Kubernetes client.
    pub fn with_client(client: kube::Client) -> Self {
        Self {
            list_params: api::ListParams::default(),
            patch_params: api::PatchParams::default(),
            client,
        }
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }

    fn namespaces(&self) -> api::Api<corev1::Namespace> {
        api::Api::all(self.client.clone())
    }

    fn pods(&self, namespace: &str) -> api::Api<corev1::Pod> {
        api::Api::namespaced(self.client.clone(), namespace)
    }

    fn all_pods(&self) -> api::Api<corev1::Pod> {
        api::Api::all(self.client.clone())
    }

    fn list_params(&self) -> &api::ListParams {
        &self.list_params
    }

    fn on_node(&self, node: &str) -> api::ListParams {
        on_node(self.list_params(), node)
    }
}

fn on_node(list_params: &api::ListParams, node: &str) -> api::ListParams {
    list_params
        .clone()
        .fields(&format!("spec.nodeName={node}"))
}

/// DaemonSet pods come straight back and mirror pods belong to the kubelet.
fn is_drainable(pod: &corev1::Pod) -> bool {
    !pod.is_daemonset_pod() && !pod.is_mirror_pod()
}

#[async_trait]
impl ClusterApi for KubeApi {
    async fn list_nodes(&self) -> kube::Result<Vec<corev1::Node>> {
        let lp = self.list_params();
        self.nodes().list(lp).await.map(|list| list.items)
    }

    async fn list_namespaces(&self) -> kube::Result<Vec<String>> {
        let lp = self.list_params();
        let namespaces = self.namespaces().list_metadata(lp).await?;
        Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
    }

    async fn list_pods_on_node(
        &self,
        namespace: &str,
        node: &str,
    ) -> kube::Result<Vec<corev1::Pod>> {
        let lp = self.on_node(node);
        self.pods(namespace).list(&lp).await.map(|list| list.items)
    }

    async fn cordon_node(&self, node: &str) -> kube::Result<corev1::Node> {
        let patch = api::Patch::Merge(corev1::Node::cordoned());
        self.nodes().patch(node, &self.patch_params, &patch).await
    }

    async fn evict_pod(
        &self,
        namespace: &str,
        pod: &str,
        grace_period: Duration,
    ) -> kube::Result<()> {
        let grace_period_seconds = u32::try_from(grace_period.as_secs()).unwrap_or(u32::MAX);
        let ep = api::EvictParams {
            delete_options: Some(api::DeleteParams {
                grace_period_seconds: Some(grace_period_seconds),
                ..k8s::default()
            }),
            ..k8s::default()
        };
        let api = self.pods(namespace);
        api.evict(pod, &ep).await?;
        Ok(())
    }

    async fn force_drain_node(&self, node: &str) -> kube::Result<Vec<String>> {
        let lp = self.on_node(node);
        let pods = self.all_pods().list(&lp).await?.items;
        let dp = api::DeleteParams::default();
        let mut remaining = Vec::new();

        for pod in pods.iter().filter(|pod| is_drainable(pod)) {
            let name = pod.name_any();
            let namespace = pod.namespace().unwrap_or_default();
            let local_storage = pod.uses_local_storage();
            let api = self.pods(&namespace);
            let deleted = api.delete(&name, &dp).await;
            match deleted {
                Ok(_) => tracing::debug!(node, namespace, pod = name, local_storage, "Deleted pod"),
                Err(err) => {
                    tracing::warn!(node, namespace, pod = name, %err, "Failed to delete pod");
                    remaining.push(format!("{namespace}/{name}"));
                }
            }
        }

        Ok(remaining)
    }
}

impl Debug for KubeApi {
    /// Formats the `KubeApi` for debugging while redacting the `client`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApi")
            .field("list_params", &self.list_params)
            .field("patch_params", &self.patch_params)
            .field("client", &"<kube::Client>")
            .finish()
    }
}
