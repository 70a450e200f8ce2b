//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the controller and the generation store.
use std::sync::Arc;

use crate::tools::{AssetFetchParams, CacheGetParams, activate_impl, asset_fetch_impl, get_impl, setup_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shellcache_client::{Network, OfflineController};
use url::Url;

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellCacheServer {
    controller: OfflineController,
    network: Arc<dyn Network>,
    base: Url,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl ShellCacheServer {
    /// Create a new server handler around a booted controller.
    ///
    /// `network` is used directly for requests the controller declines.
    pub fn new(controller: OfflineController, network: Arc<dyn Network>, base: Url) -> Self {
        Self { controller, network, base, tool_router: Self::tool_router() }
    }

    #[tool(description = "Open the current cache generation and pre-cache every manifest asset. Best-effort: failed assets are listed, not fatal.")]
    async fn cache_setup(&self) -> Result<CallToolResult, McpError> {
        setup_impl(&self.controller).await
    }

    #[tool(description = "Delete every cache generation except the current one and start intercepting requests. Requires a completed setup.")]
    async fn cache_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.controller).await
    }

    /// Fetch an asset the way the page would.
    ///
    /// Cache first, network on miss, offline shell for navigations. Requests
    /// the controller declines are fetched directly.
    #[tool(description = "Fetch an asset through the offline cache: stored copy first, network on miss, app shell for offline navigations.")]
    async fn asset_fetch(&self, params: Parameters<AssetFetchParams>) -> Result<CallToolResult, McpError> {
        asset_fetch_impl(&self.controller, self.network.as_ref(), &self.base, params.0).await
    }

    #[tool(description = "Report the lifecycle phase, the current generation and every stored generation with its entry count.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.controller).await
    }

    #[tool(description = "Look up one stored response by URL without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.controller, &self.base, params.0).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
