//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> Result<Url, url::ParseError> {
    base.join(href)
}

/// Parse an API root so that relative joins append to it.
///
/// `https://host/api/v1` becomes `https://host/api/v1/`.
pub fn api_root(base_url: &str) -> Result<Url, url::ParseError> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

/// Size in mebibytes, for progress output.
pub fn mebibytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page?x=1").unwrap().as_str(),
            "https://example.com/path/page?x=1"
        );
        assert_eq!(
            resolve_url(&base, "/root").unwrap().as_str(),
            "https://example.com/root"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x").unwrap().as_str(),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_api_root_appends_slash() {
        let root = api_root("https://example.com/api/v1").unwrap();
        assert_eq!(root.as_str(), "https://example.com/api/v1/");
        assert_eq!(
            root.join("livsmedel/5").unwrap().as_str(),
            "https://example.com/api/v1/livsmedel/5"
        );
        assert_eq!(api_root("https://example.com/api/v1/").unwrap(), root);
    }

    #[test]
    fn test_mebibytes() {
        assert_eq!(mebibytes(1024 * 1024 * 3), 3.0);
    }
}
