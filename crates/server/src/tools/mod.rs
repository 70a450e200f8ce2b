//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.
#![allow(unused_imports)]

pub mod asset_fetch;
pub mod cache;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CachedResponse, Error};

pub use asset_fetch::{AssetFetchParams, AssetSource, asset_fetch_impl};
pub use cache::{CacheGetParams, get_impl, status_impl};
pub use lifecycle::{activate_impl, setup_impl};

/// A response as returned to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// Final URL of the response.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// `basic`, `cors` or `opaque`.
    pub kind: String,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body size in bytes.
    pub body_len: usize,
    /// Body as text, if it is valid UTF-8.
    pub body: Option<String>,
}

impl From<&CachedResponse> for ResponseView {
    fn from(response: &CachedResponse) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.to_string(),
            content_type: response.content_type().map(str::to_string),
            headers: response.headers.clone(),
            body_len: response.body.len(),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        }
    }
}

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
