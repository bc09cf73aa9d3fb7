use reqwest::Method;

use super::*;

const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const NEXT_PAGE_HEADER: &str = "opc-next-page";
const WORK_REQUEST_HEADER: &str = "opc-work-request-id";

/// [`ContainerEngine`] speaking the container engine REST API over HTTPS.
///
/// With a [`RequestSigner`] every request carries an API key signature;
/// without one requests go out unsigned.
#[derive(Clone, Debug)]
pub struct HttpContainerEngine {
    client: reqwest::Client,
    endpoint: String,
    signer: Option<RequestSigner>,
}

impl HttpContainerEngine {
    pub fn new(endpoint: impl ToString) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT_SECONDS.std_seconds())
            .build()
            .map_err(ProviderError::transport)?;
        let endpoint = endpoint.to_string().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            endpoint,
            signer: None,
        })
    }

    /// Public endpoint of the container engine in `region`, e.g. `us-ashburn-1`.
    pub fn for_region(region: &str) -> Result<Self, ProviderError> {
        Self::new(format!("https://containerengine.{region}.oci.oraclecloud.com"))
    }

    pub fn signer(self, signer: RequestSigner) -> Self {
        Self {
            signer: Some(signer),
            ..self
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.endpoint))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        let mut request = request.build().map_err(ProviderError::transport)?;
        if let Some(signer) = &self.signer {
            signer.sign(&mut request)?;
        }
        self.client
            .execute(request)
            .await
            .map_err(ProviderError::transport)
    }
}

#[async_trait]
impl ContainerEngine for HttpContainerEngine {
    async fn list_node_pools(
        &self,
        compartment_id: &str,
        cluster_id: &str,
    ) -> Result<CallResult<Vec<NodePoolSummary>>, ProviderError> {
        let mut pools = Vec::new();
        let mut page = None::<String>;

        loop {
            let mut request = self
                .request(Method::GET, NODE_POOLS_PATH)
                .query(&[("compartmentId", compartment_id), ("clusterId", cluster_id)]);
            if let Some(page) = &page {
                request = request.query(&[("page", page)]);
            }

            let response = self.send(request).await?;
            let status = response.status().as_u16();
            if !response.status().is_success() {
                return Ok(CallResult::failed(status, error_message(response).await));
            }

            let next = header(&response, NEXT_PAGE_HEADER);
            let batch: Vec<NodePoolSummary> =
                response.json().await.map_err(ProviderError::transport)?;
            tracing::debug!(count = batch.len(), ?page, "Listed node pools");
            pools.extend(batch);

            match next {
                Some(next) => page = Some(next),
                None => return Ok(CallResult::new(status, pools)),
            }
        }
    }

    async fn update_node_pool_size(
        &self,
        node_pool_id: &str,
        size: u32,
    ) -> Result<CallResult<()>, ProviderError> {
        let path = format!("{NODE_POOLS_PATH}/{node_pool_id}");
        let body = UpdateNodePoolDetails::size(size);
        let request = self.request(Method::PUT, &path).json(&body);
        empty_result(self.send(request).await?).await
    }

    async fn delete_node(
        &self,
        node_pool_id: &str,
        node_id: &str,
    ) -> Result<CallResult<()>, ProviderError> {
        let path = format!("{NODE_POOLS_PATH}/{node_pool_id}/node/{node_id}");
        let request = self.request(Method::DELETE, &path).query(&[
            ("isDecrementSize", "true"),
            ("isForceDeletionAfterOverrideGraceDuration", "true"),
        ]);
        empty_result(self.send(request).await?).await
    }
}

async fn empty_result(response: reqwest::Response) -> Result<CallResult<()>, ProviderError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        return Ok(CallResult::failed(status, error_message(response).await));
    }

    if let Some(work_request) = header(&response, WORK_REQUEST_HEADER) {
        tracing::debug!(%work_request, "Accepted by container engine");
    }
    Ok(CallResult::new(status, ()))
}

async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        status.to_string()
    } else {
        body
    }
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
