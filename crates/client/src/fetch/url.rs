//! URL resolution for consistent request keys.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a possibly relative URL against the application origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references against `base`
/// 3. Lowercase the host (done by the parser for special schemes)
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Any scheme is accepted so that requests the router must ignore can still
/// be represented.
pub fn resolve(input: &str, base: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a URL that is going to be fetched; only http(s) is allowed.
pub fn canonicalize(input: &str, base: &Url) -> Result<Url, UrlError> {
    let parsed = resolve(input, base)?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://weather.test").unwrap()
    }

    #[test]
    fn test_resolve_relative() {
        let url = resolve("/style.css", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://weather.test/style.css");
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve("/", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://weather.test/");
    }

    #[test]
    fn test_resolve_absolute_keeps_host() {
        let url = resolve("https://cdnjs.cloudflare.com/a.css", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("cdnjs.cloudflare.com"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve("https://API.CAIYUNAPP.COM/v2", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("api.caiyunapp.com"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve("/index.html#today", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve("/css2?family=Poppins:wght@300&display=swap", &origin()).unwrap();
        assert_eq!(url.query(), Some("family=Poppins:wght@300&display=swap"));
    }

    #[test]
    fn test_resolve_extension_scheme() {
        let url = resolve("chrome-extension://abcdef/popup.js", &origin()).unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("   ", &origin()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_rejects_non_http() {
        let result = canonicalize("chrome-extension://abcdef/popup.js", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(s)) if s == "chrome-extension"));
    }

    #[test]
    fn test_canonicalize_http_allowed() {
        let url = canonicalize("http://example.com", &origin()).unwrap();
        assert_eq!(url.scheme(), "http");
    }
}
