//! cache_get tool implementation.
//!
//! Looks up one stored response without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{OfflineController, fetch::resolve};
use shellcache_core::{Error, MatchMode, RequestKey};
use url::Url;

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the application base URL.
    pub url: String,

    /// Generation to search (default: the current generation).
    #[serde(default)]
    pub generation: Option<String>,

    /// "exact" or "ignore_search" (default: the configured match mode).
    #[serde(default)]
    pub match_mode: Option<MatchMode>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub key: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    controller: &OfflineController, base: &Url, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(base, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let generation = params.generation.unwrap_or_else(|| controller.generation().to_string());
    let mode = params.match_mode.unwrap_or(controller.config().match_mode);
    let key = RequestKey::from_url(&url);

    let response = controller
        .db()
        .match_entry(&generation, &key, mode)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {generation}", key.full())))?;

    let output = CacheGetOutput { generation, key: key.full().to_string(), response: ResponseView::from(&response) };
    json_result(&output)
}
