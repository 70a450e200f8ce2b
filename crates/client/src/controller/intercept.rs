//! Interception trigger: cache-first with network fill and offline shell.

use serde::Serialize;
use shellcache_core::{CachedResponse, Error, InterceptRequest, MatchMode, RequestKey, ResponseKind};

use super::{CacheEvent, OfflineController, Phase};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

/// The controller's answer to one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Declined; the host sends the request to the network itself.
    PassThrough,
    Respond { response: CachedResponse, source: ResponseSource },
}

impl Interception {
    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Interception::PassThrough => None,
            Interception::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Interception::PassThrough => None,
            Interception::Respond { source, .. } => Some(*source),
        }
    }
}

/// Whether a network response on the miss path may be stored.
///
/// Only a plain 200 from the application's own origin qualifies.
pub fn is_cacheable(response: &CachedResponse) -> bool {
    response.status == 200 && response.kind == ResponseKind::Basic
}

impl OfflineController {
    /// Answer one outbound request.
    ///
    /// - Non-GET requests, and every request before activation, pass through.
    /// - A stored response is returned as-is without touching the network.
    /// - On a miss the network response is returned unmodified; cacheable
    ///   ones are also stored by a background task whose failure is only
    ///   observed, never returned.
    /// - If the network fails for a navigation, the first stored fallback
    ///   document is served instead.
    ///
    /// # Errors
    ///
    /// Returns the network error when there is neither a stored copy nor a
    /// fallback for the request.
    pub async fn intercept(&self, request: &InterceptRequest) -> Result<Interception, Error> {
        if !request.is_get() {
            return Ok(Interception::PassThrough);
        }

        if self.lifecycle.read().await.phase != Phase::Activated {
            tracing::trace!(url = %request.url, "not activated, passing through");
            return Ok(Interception::PassThrough);
        }

        let key = RequestKey::from_url(&request.url);
        match self.db.match_entry(&self.config.generation, &key, self.config.match_mode).await {
            Ok(Some(response)) => {
                self.emit(CacheEvent::ServedFromCache { url: request.url.to_string() });
                return Ok(Interception::Respond { response, source: ResponseSource::Cache });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed, using network"),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if is_cacheable(&response) {
                    self.store_in_background(key, response.clone()).await;
                }
                Ok(Interception::Respond { response, source: ResponseSource::Network })
            }
            Err(err) => {
                if request.is_navigation()
                    && err.is_network()
                    && let Some((document, response)) = self.fallback_document().await
                {
                    self.emit(CacheEvent::ServedFallback { url: request.url.to_string(), document });
                    return Ok(Interception::Respond { response, source: ResponseSource::Fallback });
                }
                Err(err)
            }
        }
    }

    /// First configured fallback document present in the current generation.
    async fn fallback_document(&self) -> Option<(String, CachedResponse)> {
        for document in &self.config.fallback_documents {
            let key = RequestKey::from_url(document);
            match self.db.match_entry(&self.config.generation, &key, MatchMode::Exact).await {
                Ok(Some(response)) => return Some((document.to_string(), response)),
                Ok(None) => {}
                Err(e) => tracing::warn!(document = %document, error = %e, "fallback lookup failed"),
            }
        }
        None
    }

    async fn store_in_background(&self, key: RequestKey, response: CachedResponse) {
        let db = self.db.clone();
        let observer = self.observer.clone();
        let generation = self.config.generation.clone();

        self.spawn_background(async move {
            let event = match db.put_entry(&generation, &key, &response).await {
                Ok(()) => CacheEvent::EntryStored { key: key.full().to_string() },
                Err(e) => CacheEvent::StoreFailed { key: key.full().to_string(), error: e.to_string() },
            };
            observer.on_event(&event);
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{activated, harness, url};
    use super::*;
    use bytes::Bytes;
    use shellcache_core::RequestMode;

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        let before = h.db.entry_count("app-v7").await.unwrap();

        for method in ["POST", "PUT", "DELETE", "HEAD"] {
            let request = InterceptRequest::new(method, url("./index.html"), RequestMode::SameOrigin);
            let outcome = h.controller.intercept(&request).await.unwrap();
            assert_eq!(outcome, Interception::PassThrough);
        }

        h.controller.settle().await;
        assert!(h.network.calls().is_empty());
        assert_eq!(h.db.entry_count("app-v7").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_passes_through_before_activation() {
        let h = harness(&["./"], MatchMode::IgnoreSearch).await;
        h.network.serve("./", "root");
        h.controller.setup().await.unwrap();

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./"))).await.unwrap();

        assert_eq!(outcome, Interception::PassThrough);
    }

    #[tokio::test]
    async fn test_hit_served_without_network() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./index.html"))).await.unwrap();

        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        let response = outcome.response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from_static(b"<html>shell</html>"));
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_hit_is_never_revalidated() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.serve("./index.html", "<html>new shell</html>");

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./index.html"))).await.unwrap();
        h.controller.settle().await;

        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"<html>shell</html>"));
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ignore_search_hit() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./index.html?x=1"))).await.unwrap();

        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"<html>shell</html>"));
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_exact_mode_misses_on_query() {
        let h = activated(&["./", "./index.html"], MatchMode::Exact).await;

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./index.html?x=1"))).await.unwrap();

        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(h.network.calls(), vec![format!("GET {}", url("./index.html?x=1"))]);
    }

    #[tokio::test]
    async fn test_miss_stores_basic_ok_response() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.serve("./app.js", "console.log(1)");

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./app.js"))).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"console.log(1)"));

        h.controller.settle().await;

        let key = RequestKey::from_url(&url("./app.js"));
        let stored = h.db.match_entry("app-v7", &key, MatchMode::Exact).await.unwrap().unwrap();
        assert_eq!(&stored, outcome.response().unwrap());
        assert_eq!(h.db.entry_count("app-v7").await.unwrap(), 3);
        assert!(h.observer.events().contains(&CacheEvent::EntryStored { key: url("./app.js").to_string() }));

        h.network.reset_calls();
        let again = h.controller.intercept(&InterceptRequest::get(url("./app.js"))).await.unwrap();
        assert_eq!(again.source(), Some(ResponseSource::Cache));
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_miss_does_not_store_error_status() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.route("./gone.js", 404, ResponseKind::Basic, "nope");
        h.network.route("./moved", 301, ResponseKind::Basic, "");

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./gone.js"))).await.unwrap();
        let moved = h.controller.intercept(&InterceptRequest::get(url("./moved"))).await.unwrap();
        h.controller.settle().await;

        assert_eq!(outcome.response().unwrap().status, 404);
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"nope"));
        assert_eq!(moved.response().unwrap().status, 301);
        assert_eq!(h.db.entry_count("app-v7").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_miss_does_not_store_cross_origin() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.route("./cors.json", 200, ResponseKind::Cors, "{}");
        h.network.route("./opaque.js", 200, ResponseKind::Opaque, "");

        let cors = h.controller.intercept(&InterceptRequest::get(url("./cors.json"))).await.unwrap();
        let opaque = h.controller.intercept(&InterceptRequest::get(url("./opaque.js"))).await.unwrap();
        h.controller.settle().await;

        assert_eq!(cors.response().unwrap().kind, ResponseKind::Cors);
        assert_eq!(opaque.response().unwrap().kind, ResponseKind::Opaque);
        assert_eq!(h.db.entry_count("app-v7").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_shell() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.set_online(false);

        let outcome = h.controller.intercept(&InterceptRequest::navigate(url("/page"))).await.unwrap();

        assert_eq!(outcome.source(), Some(ResponseSource::Fallback));
        let response = outcome.response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from_static(b"<html>shell</html>"));
        assert!(h.observer.events().contains(&CacheEvent::ServedFallback {
            url: url("/page").to_string(),
            document: url("./index.html").to_string(),
        }));
    }

    #[tokio::test]
    async fn test_offline_navigation_uses_root_when_index_missing() {
        let h = activated(&["./"], MatchMode::IgnoreSearch).await;
        h.network.set_online(false);

        let outcome = h.controller.intercept(&InterceptRequest::navigate(url("/page"))).await.unwrap();

        assert_eq!(outcome.source(), Some(ResponseSource::Fallback));
        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"<html>root</html>"));
    }

    #[tokio::test]
    async fn test_offline_subresource_miss_fails() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.set_online(false);

        let result = h.controller.intercept(&InterceptRequest::get(url("./chart.js"))).await;

        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_offline_navigation_without_shell_fails() {
        let h = activated(&[], MatchMode::IgnoreSearch).await;
        h.network.set_online(false);

        let result = h.controller.intercept(&InterceptRequest::navigate(url("/page"))).await;

        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_store_failure_is_observed_not_returned() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        h.network.serve("./late.js", "late");
        h.db.delete_generation("app-v7").await.unwrap();

        let outcome = h.controller.intercept(&InterceptRequest::get(url("./late.js"))).await.unwrap();
        h.controller.settle().await;

        assert_eq!(outcome.response().unwrap().body, Bytes::from_static(b"late"));
        let failures = h.observer.failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], CacheEvent::StoreFailed { error, .. } if error.starts_with("GENERATION_MISSING")));
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_store_once() {
        let h = activated(&["./", "./index.html"], MatchMode::IgnoreSearch).await;
        let paths: Vec<String> = (0..8).map(|i| format!("./chunk-{i}.js")).collect();
        for path in &paths {
            h.network.serve(path, "chunk");
        }

        let mut tasks = tokio::task::JoinSet::new();
        for path in &paths {
            let controller = h.controller.clone();
            let request = InterceptRequest::get(url(path));
            tasks.spawn(async move { controller.intercept(&request).await });
        }
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap().unwrap();
            assert_eq!(outcome.source(), Some(ResponseSource::Network));
        }
        h.controller.settle().await;

        assert_eq!(h.db.entry_count("app-v7").await.unwrap(), 2 + 8);
    }

    #[test]
    fn test_is_cacheable() {
        let u = url("./a.js");
        let ok = super::super::testing::response(&u, 200, ResponseKind::Basic, "");
        assert!(is_cacheable(&ok));
        assert!(!is_cacheable(&CachedResponse { status: 204, ..ok.clone() }));
        assert!(!is_cacheable(&CachedResponse { kind: ResponseKind::Cors, ..ok }));
    }
}
