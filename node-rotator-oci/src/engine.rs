use super::*;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_config_details: Option<NodeConfigDetails>,
}

impl NodePoolSummary {
    pub fn size(&self) -> u32 {
        self.node_config_details
            .map(|details| details.size)
            .unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigDetails {
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePoolDetails {
    pub node_config_details: NodeConfigDetails,
}

impl UpdateNodePoolDetails {
    pub fn size(size: u32) -> Self {
        let node_config_details = NodeConfigDetails { size };
        Self {
            node_config_details,
        }
    }
}

/// Outcome of one container engine API call.
///
/// A call only counts as successful when its status is in the 2xx class;
/// callers go through [`CallResult::into_result`] before using the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult<T> {
    status: u16,
    payload: Option<T>,
    message: String,
}

impl<T> CallResult<T> {
    pub fn new(status: u16, payload: T) -> Self {
        Self {
            status,
            payload: Some(payload),
            message: String::new(),
        }
    }

    pub fn failed(status: u16, message: impl ToString) -> Self {
        Self {
            status,
            payload: None,
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }

    pub fn into_result(self, operation: &'static str) -> Result<T, ProviderError> {
        let Self {
            status,
            payload,
            message,
        } = self;
        match payload {
            Some(payload) if is_success(status) => Ok(payload),
            _ => Err(ProviderError::Call {
                operation,
                status,
                message,
            }),
        }
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Node pool operations of a managed container engine.
///
/// An `Err` means the call could not be made at all; a call the engine
/// rejected comes back as an unsuccessful [`CallResult`].
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn list_node_pools(
        &self,
        compartment_id: &str,
        cluster_id: &str,
    ) -> Result<CallResult<Vec<NodePoolSummary>>, ProviderError>;

    async fn update_node_pool_size(
        &self,
        node_pool_id: &str,
        size: u32,
    ) -> Result<CallResult<()>, ProviderError>;

    /// Deletes the node backed by instance `node_id`, decrementing the pool size
    /// and forcing termination past any eviction grace period.
    async fn delete_node(
        &self,
        node_pool_id: &str,
        node_id: &str,
    ) -> Result<CallResult<()>, ProviderError>;
}
