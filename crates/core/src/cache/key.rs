//! Request identity used to address cache entries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// How a lookup compares the request against stored identities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Full URL including the query string.
    Exact,
    /// URL with the query string removed on both sides.
    #[default]
    IgnoreSearch,
}

/// Normalized request identity.
///
/// Holds the full URL form (fragment removed, query kept) and the same URL
/// with the query removed. Host case and default ports are already
/// normalized by URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    full: String,
    without_search: String,
}

impl RequestKey {
    pub fn from_url(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        let full = url.to_string();
        url.set_query(None);
        Self { full, without_search: url.to_string() }
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn without_search(&self) -> &str {
        &self.without_search
    }

    /// The column value compared under the given mode.
    pub fn lookup(&self, mode: MatchMode) -> &str {
        match mode {
            MatchMode::Exact => &self.full,
            MatchMode::IgnoreSearch => &self.without_search,
        }
    }
}
