use super::*;

const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

pub trait PodExt {
    /// Pod is owned by a DaemonSet and would be recreated on the same node.
    fn is_daemonset_pod(&self) -> bool;
    /// Static pod mirrored by the kubelet; it cannot be evicted through the API.
    fn is_mirror_pod(&self) -> bool;
    fn uses_local_storage(&self) -> bool;
}

impl PodExt for corev1::Pod {
    fn is_daemonset_pod(&self) -> bool {
        self.metadata
            .owner_references
            .iter()
            .flatten()
            .any(|owner| owner.kind == "DaemonSet")
    }

    fn is_mirror_pod(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .is_some_and(|annotations| annotations.contains_key(MIRROR_POD_ANNOTATION))
    }

    fn uses_local_storage(&self) -> bool {
        self.spec
            .iter()
            .flat_map(|spec| spec.volumes.iter().flatten())
            .any(|volume| volume.empty_dir.is_some())
    }
}
