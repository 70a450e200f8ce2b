//! asset_fetch tool implementation.
//!
//! Routes one request through the controller. When the controller declines
//! (non-GET, or not yet activated) the server performs the fetch itself,
//! the same way the page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Interception, Network, OfflineController, ResponseSource, fetch::resolve};
use shellcache_core::{Error, InterceptRequest, RequestMode};
use url::Url;

use super::{ResponseView, json_result};

/// Parameters for the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchParams {
    /// Absolute URL, or a path relative to the application base URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin" (default), "no-cors" or "cors".
    #[serde(default)]
    pub mode: RequestMode,
}

fn default_method() -> String {
    "GET".into()
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetSource {
    Cache,
    Network,
    Fallback,
    /// The controller declined and the server fetched directly.
    PassThrough,
}

impl From<ResponseSource> for AssetSource {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Cache => AssetSource::Cache,
            ResponseSource::Network => AssetSource::Network,
            ResponseSource::Fallback => AssetSource::Fallback,
        }
    }
}

/// Output from the asset_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AssetFetchOutput {
    pub source: AssetSource,
    pub response: ResponseView,
}

/// Implementation of the asset_fetch tool.
pub async fn asset_fetch_impl(
    controller: &OfflineController, network: &dyn Network, base: &Url, params: AssetFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method must not be empty".to_string()).into());
    }
    let url = resolve(base, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = InterceptRequest::new(params.method.trim(), url, params.mode);

    let (response, source) = match controller.intercept(&request).await? {
        Interception::Respond { response, source } => (response, source.into()),
        Interception::PassThrough => (network.fetch(&request).await?, AssetSource::PassThrough),
    };

    tracing::debug!(url = %request.url, source = ?source, status = response.status, "asset served");

    json_result(&AssetFetchOutput { source, response: ResponseView::from(&response) })
}
