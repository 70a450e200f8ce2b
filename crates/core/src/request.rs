//! Request and response values exchanged between the page, the controller
//! and the network.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    #[default]
    SameOrigin,
    NoCors,
    Cors,
}

/// One outbound request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptRequest {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl InterceptRequest {
    /// Create a request with an explicit method and mode.
    pub fn new(method: impl Into<String>, url: Url, mode: RequestMode) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, mode }
    }

    /// A plain subresource `GET`.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, RequestMode::SameOrigin)
    }

    /// A page navigation `GET`.
    pub fn navigate(url: Url) -> Self {
        Self::new("GET", url, RequestMode::Navigate)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Response type as the page would observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same origin as the application.
    Basic,
    /// Cross-origin with a readable status.
    Cors,
    /// Cross-origin without a readable status.
    Opaque,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Basic => "basic",
            ResponseKind::Cors => "cors",
            ResponseKind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseKind::Basic),
            "cors" => Ok(ResponseKind::Cors),
            "opaque" => Ok(ResponseKind::Opaque),
            other => Err(format!("unknown response kind: {other}")),
        }
    }
}

/// A complete response: what the network returned or what the store holds.
///
/// The body is reference-counted, so cloning a response to hand one copy to
/// the caller and another to the store does not copy the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    /// Header name/value pairs in the order received.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl CachedResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
