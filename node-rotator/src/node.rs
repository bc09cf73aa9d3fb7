use k8s::NodeExt as _;

use super::*;

/// A worker node selected for rotation.
///
/// Built from the live node listing at scan time. The name and provider
/// instance id cannot change once the node is part of a [`RotationSet`].
#[derive(Clone, Debug, PartialEq)]
pub struct RotatableNode {
    name: String,
    provider_id: Option<String>,
    created: Timestamp,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    spec: corev1::NodeSpec,
}

impl RotatableNode {
    /// Returns `None` for nodes lacking a name or a creation timestamp.
    pub fn from_node(node: &corev1::Node) -> Option<Self> {
        let name = node.metadata.name.clone()?;
        let created = node.created_at()?;
        let provider_id = node.provider_id().map(ToString::to_string);
        let labels = node.metadata.labels.clone().unwrap_or_default();
        let annotations = node.metadata.annotations.clone().unwrap_or_default();
        let spec = node.spec.clone().unwrap_or_default();
        Some(Self {
            name,
            provider_id,
            created,
            labels,
            annotations,
            spec,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance id assigned by the capacity provider (`spec.providerID`).
    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn age(&self, now: Timestamp) -> SignedDuration {
        now.duration_since(self.created)
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    pub fn spec(&self) -> &corev1::NodeSpec {
        &self.spec
    }
}

impl fmt::Display for RotatableNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Nodes selected by one scan, in cluster listing order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RotationSet {
    nodes: Vec<RotatableNode>,
}

impl RotationSet {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&RotatableNode> {
        self.nodes.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RotatableNode> {
        self.nodes.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(RotatableNode::name).collect()
    }

    pub fn to_vec(&self) -> Vec<RotatableNode> {
        self.nodes.clone()
    }
}

impl FromIterator<RotatableNode> for RotationSet {
    fn from_iter<T: IntoIterator<Item = RotatableNode>>(iter: T) -> Self {
        let nodes = iter.into_iter().collect();
        Self { nodes }
    }
}

impl<'a> IntoIterator for &'a RotationSet {
    type Item = &'a RotatableNode;
    type IntoIter = std::slice::Iter<'a, RotatableNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
