use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Discovered,
    Cordoned,
    Draining,
    Drained,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Discovered => "discovered",
            Self::Cordoned => "cordoned",
            Self::Draining => "draining",
            Self::Drained => "drained",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeOutcome {
    Succeeded,
    /// Node was left untouched in `Discovered` for manual follow-up.
    CordonFailed { reason: String },
    /// Drain completed but these pods (`namespace/name`) were not evicted cleanly.
    PartiallyEvicted { failed_pods: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeReport {
    pub node: String,
    pub state: NodeState,
    pub evicted: usize,
    pub outcome: NodeOutcome,
}

impl NodeReport {
    pub(crate) fn cordon_failed(node: &RotatableNode, error: &NodeError) -> Self {
        Self {
            node: node.name().to_string(),
            state: NodeState::Discovered,
            evicted: 0,
            outcome: NodeOutcome::CordonFailed {
                reason: error.to_string(),
            },
        }
    }

    pub(crate) fn drained(node: &RotatableNode, evicted: usize, failed_pods: Vec<String>) -> Self {
        let outcome = if failed_pods.is_empty() {
            NodeOutcome::Succeeded
        } else {
            NodeOutcome::PartiallyEvicted { failed_pods }
        };
        Self {
            node: node.name().to_string(),
            state: NodeState::Drained,
            evicted,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == NodeOutcome::Succeeded
    }
}

/// Per-node outcome of one `rotate` call, in rotation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RotationReport {
    dry_run: bool,
    nodes: Vec<NodeReport>,
}

impl RotationReport {
    pub(crate) fn new(dry_run: bool) -> Self {
        let nodes = Vec::new();
        Self { dry_run, nodes }
    }

    pub(crate) fn push(&mut self, report: NodeReport) {
        self.nodes.push(report);
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn nodes(&self) -> &[NodeReport] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.node == name)
    }

    pub fn succeeded(&self) -> usize {
        self.nodes.iter().filter(|report| report.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.nodes.len() - self.succeeded()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }
}
