//! cache_setup and cache_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_client::OfflineController;

use super::json_result;

/// Run setup and return the `SetupReport`.
pub async fn setup_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let report = controller.setup().await?;
    json_result(&report)
}

/// Run activation and return the `ActivateReport`.
pub async fn activate_impl(controller: &OfflineController) -> Result<CallToolResult, McpError> {
    let report = controller.activate().await?;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{controller, output};
    use super::*;

    #[tokio::test]
    async fn test_setup_reports_cached_and_failed() {
        let (controller, network, _) = controller(&["./", "./missing.css"]).await;
        network.serve("./", "<html></html>");

        let result = setup_impl(&controller).await.unwrap();
        let report: serde_json::Value = output(&result);

        assert_eq!(report["generation"], "app-v7");
        assert_eq!(report["created"], true);
        assert_eq!(report["cached"], serde_json::json!(["https://app.test/"]));
        assert_eq!(report["failed"][0]["url"], "https://app.test/missing.css");
    }

    #[tokio::test]
    async fn test_activate_before_setup_is_error() {
        let (controller, _, _) = controller(&["./"]).await;

        let err = activate_impl(&controller).await.unwrap_err();

        assert_eq!(err.code.0, -32009);
    }

    #[tokio::test]
    async fn test_activate_after_setup() {
        let (controller, network, _) = controller(&["./"]).await;
        network.serve("./", "<html></html>");
        controller.db().open_generation("app-v6").await.unwrap();
        setup_impl(&controller).await.unwrap();

        let result = activate_impl(&controller).await.unwrap();
        let report: serde_json::Value = output(&result);

        assert_eq!(report["purged"], serde_json::json!(["app-v6"]));
        assert!(report["failed"].as_array().unwrap().is_empty());
    }
}
