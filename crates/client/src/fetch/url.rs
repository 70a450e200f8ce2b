//! Resolution of manifest identifiers into absolute request URLs.

use url::{ParseError, Url};

/// Error type for asset identifier resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve an asset identifier against the application base URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are parsed as-is, relative ones join onto `base`
/// 3. Only http and https are accepted
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(base: &Url, identifier: &str) -> Result<Url, UrlError> {
    let trimmed = identifier.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Err(ParseError::RelativeUrlWithoutBase) => base.join(trimmed),
        other => other,
    }
    .map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve every identifier, failing on the first invalid one.
pub fn resolve_all<'a>(base: &Url, identifiers: impl IntoIterator<Item = &'a String>) -> Result<Vec<Url>, UrlError> {
    identifiers.into_iter().map(|id| resolve(base, id)).collect()
}
