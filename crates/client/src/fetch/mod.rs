//! HTTP fetch boundary used by the controller.
//!
//! ### Network trait
//! - The controller only sees `Network`, so hosts and tests can swap the
//!   transport.
//! - Transport failures are errors; any HTTP status is a response.
//!
//! ### Response classification
//! - Same origin as the application: `basic`
//! - Cross-origin, `no-cors` request: `opaque`
//! - Any other cross-origin response: `cors`
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

use shellcache_core::{AppConfig, CachedResponse, Error, InterceptRequest, RequestMode, ResponseKind};

pub use self::url::{UrlError, resolve, resolve_all};

/// Stable network trait for outbound requests.
///
/// This allows swapping the HTTP stack without touching controller code.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request and return the complete response.
    async fn fetch(&self, request: &InterceptRequest) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin of the application, used to classify responses.
    pub app_origin: ::url::Origin,
}

impl FetchConfig {
    /// Build the fetch configuration from application settings.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let base = config.base_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            app_origin: base.origin(),
        })
    }
}

/// Classify a response the way the page would observe it.
pub fn classify(app_origin: &::url::Origin, final_url: &::url::Url, mode: RequestMode) -> ResponseKind {
    if &final_url.origin() == app_origin {
        ResponseKind::Basic
    } else if mode == RequestMode::NoCors {
        ResponseKind::Opaque
    } else {
        ResponseKind::Cors
    }
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::FetchFailed(format!("network error: {}", err))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &InterceptRequest) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(transport_error)?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        let kind = classify(&self.config.app_origin, &final_url, request.mode);

        tracing::debug!(
            "fetched {} -> {} ({} {}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            kind,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CachedResponse {
            url: final_url,
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            kind,
        })
    }
}
