use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use node_rotator_ext as k8s;
use node_rotator_kubeapi::ClusterApi;
use time::ext::NumericalStdDuration as _;

use k8s::jiff::{SignedDuration, Timestamp};
use k8s::corev1;

pub use criterion::{RotationCriterion, RotationPolicy};
pub use error::{Error, NodeError, ProviderError, Result};
pub use node::{RotatableNode, RotationSet};
pub use provider::{CapacityProvider, SelfManagedProvider};
pub use report::{NodeOutcome, NodeReport, NodeState, RotationReport};
pub use rotation::{Phase, Rotation, RunSummary};
pub use rotator::{NodeRotator, RotatorConfig};

mod criterion;
mod error;
mod node;
mod provider;
mod report;
mod rotation;
mod rotator;

#[cfg(test)]
mod fake;
