//! cache_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::OfflineController;
use shellcache_core::GenerationInfo;

use crate::tools::json_result;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Name of the current generation.
    pub generation: String,
    pub phase: String,
    pub waiting: bool,
    pub clients_claimed: bool,
    /// Every stored generation, oldest first.
    pub generations: Vec<GenerationInfo>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let lifecycle = controller.lifecycle().await;
    let generations = controller.db().generations().await?;

    let output = CacheStatusOutput {
        generation: controller.generation().to_string(),
        phase: lifecycle.phase.to_string(),
        waiting: lifecycle.waiting,
        clients_claimed: lifecycle.clients_claimed,
        generations,
    };
    json_result(&output)
}
