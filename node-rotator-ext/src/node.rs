use k8s_openapi::jiff::Timestamp;

use super::*;

pub trait NodeExt {
    /// A node carrying only `spec.unschedulable = true`, suitable as a merge patch.
    fn cordoned() -> Self;
    fn is_unschedulable(&self) -> bool;
    fn provider_id(&self) -> Option<&str>;
    fn created_at(&self) -> Option<Timestamp>;
}

impl NodeExt for corev1::Node {
    fn cordoned() -> Self {
        let spec = corev1::NodeSpec {
            unschedulable: Some(true),
            ..default()
        };
        Self {
            spec: Some(spec),
            ..default()
        }
    }

    fn is_unschedulable(&self) -> bool {
        self.spec
            .as_ref()
            .and_then(|spec| spec.unschedulable)
            .unwrap_or_default()
    }

    fn provider_id(&self) -> Option<&str> {
        self.spec.as_ref()?.provider_id.as_deref()
    }

    fn created_at(&self) -> Option<Timestamp> {
        self.metadata.creation_timestamp.as_ref().map(|ts| ts.0)
    }
}
