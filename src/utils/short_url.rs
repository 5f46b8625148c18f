//! Conversions between short identifiers and full short URLs.

/// Builds `{base_url}/{id}`. `base_url` must not end with `/`.
pub fn build_short_url(base_url: &str, id: &str) -> String {
    format!("{}/{}", base_url, id)
}

/// Normalizes a deletion token to a bare identifier.
///
/// Tokens starting with `{base_url}/` have that prefix removed; anything
/// else is taken to be an identifier already.
pub fn strip_base_url<'a>(base_url: &str, token: &'a str) -> &'a str {
    token
        .strip_prefix(base_url)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost:8080";

    #[test]
    fn test_build_short_url() {
        assert_eq!(
            build_short_url(BASE, "c984d06a"),
            "http://localhost:8080/c984d06a"
        );
    }

    #[test]
    fn test_strip_full_short_url() {
        assert_eq!(
            strip_base_url(BASE, "http://localhost:8080/c984d06a"),
            "c984d06a"
        );
    }

    #[test]
    fn test_strip_keeps_bare_identifier() {
        assert_eq!(strip_base_url(BASE, "c984d06a"), "c984d06a");
    }

    #[test]
    fn test_strip_requires_separator_after_base() {
        assert_eq!(
            strip_base_url(BASE, "http://localhost:8080abc"),
            "http://localhost:8080abc"
        );
        assert_eq!(
            strip_base_url(BASE, "http://localhost:80801/c984d06a"),
            "http://localhost:80801/c984d06a"
        );
    }

    #[test]
    fn test_strip_ignores_other_hosts() {
        assert_eq!(
            strip_base_url(BASE, "https://other.host/c984d06a"),
            "https://other.host/c984d06a"
        );
    }
}
