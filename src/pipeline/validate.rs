//! Supported-platform allow-list.

use url::Url;

/// Platforms the bot will fetch from.
pub const SUPPORTED_DOMAINS: &[&str] = &[
    "instagram.com",
    "instagr.am",
    "tiktok.com",
    "youtube.com",
    "youtu.be",
];

/// True iff the URL's host equals an allow-listed domain or is a proper
/// subdomain of one. A host that merely contains a listed domain as a
/// substring (`notinstagram.com`) is rejected. Total: unparseable input
/// is simply unsupported.
#[must_use]
pub fn is_supported_source(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    SUPPORTED_DOMAINS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_domain_accepted() {
        assert!(is_supported_source("https://instagram.com/p/x"));
        assert!(is_supported_source("https://youtu.be/abc123"));
        assert!(is_supported_source("https://tiktok.com/@u/video/1"));
    }

    #[test]
    fn test_subdomain_accepted() {
        assert!(is_supported_source("https://www.instagram.com/p/x"));
        assert!(is_supported_source("https://x.instagram.com/p/x"));
        assert!(is_supported_source("https://m.youtube.com/watch?v=1"));
    }

    #[test]
    fn test_substring_host_rejected() {
        assert!(!is_supported_source("https://notinstagram.com/p/x"));
        assert!(!is_supported_source("https://evilinstagram.com/p/x"));
        assert!(!is_supported_source("https://youtube.com.evil.org/x"));
    }

    #[test]
    fn test_unsupported_platform_rejected() {
        assert!(!is_supported_source("https://vimeo.com/123"));
    }

    #[test]
    fn test_case_insensitive_host() {
        assert!(is_supported_source("https://WWW.INSTAGRAM.COM/p/x"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(!is_supported_source("not a url at all"));
        assert!(!is_supported_source(""));
    }
}
