use std::time::Duration;

use async_trait::async_trait;
use constcat::concat;
use node_rotator::{CapacityProvider, ProviderError, RotatableNode, RotationSet};
use serde::{Deserialize, Serialize};
use time::ext::NumericalStdDuration as _;

pub use auth::{OciProfile, RequestSigner, DEFAULT_PROFILE};
pub use config::ProviderConfig;
pub use engine::{
    CallResult, ContainerEngine, NodeConfigDetails, NodePoolSummary, UpdateNodePoolDetails,
};
pub use http::HttpContainerEngine;
pub use provider::ManagedClusterProvider;

/// Node annotation carrying the compartment the node's cluster lives in.
pub const COMPARTMENT_ANNOTATION: &str = "oci.oraclecloud.com/compartment-id";
/// Only node pools whose name starts with this prefix are resized.
pub const NODE_POOL_FILTER: &str = "non-autoscaler";
pub const CONTAINER_ENGINE_API_VERSION: &str = "20180222";

const NODE_POOLS_PATH: &str = concat!("/", CONTAINER_ENGINE_API_VERSION, "/nodePools");

mod auth;
mod config;
mod engine;
mod http;
mod provider;
