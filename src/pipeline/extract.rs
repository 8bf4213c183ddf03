//! First-URL extraction from free text.

#![allow(clippy::non_std_lazy_statics)]

use lazy_regex::lazy_regex;

/// First `http(s)://` run of non-whitespace, scheme case-insensitive.
static URL_RE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"(?i)https?://\S+");

/// Pull the first URL out of `text`, stripping trailing `)`, `.` and `,`
/// left over from prose around the link. Returns `None` when the text
/// contains no URL at all. Total over arbitrary input.
#[must_use]
pub fn extract_url(text: &str) -> Option<&str> {
    let found = URL_RE.find(text)?.as_str();
    let cleaned = found.trim_end_matches([')', '.', ',']);
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_url_in_text() {
        assert_eq!(extract_url(""), None);
        assert_eq!(extract_url("just some words"), None);
        assert_eq!(extract_url("ftp://not.http"), None);
    }

    #[test]
    fn test_first_url_is_taken() {
        let text = "see https://youtu.be/abc and https://youtu.be/def";
        assert_eq!(extract_url(text), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_trailing_punctuation_stripped() {
        assert_eq!(
            extract_url("(watch https://youtu.be/abc123)."),
            Some("https://youtu.be/abc123")
        );
        assert_eq!(
            extract_url("link: https://tiktok.com/@u/video/1,"),
            Some("https://tiktok.com/@u/video/1")
        );
        // Repeated strip, not a single character
        assert_eq!(
            extract_url("https://youtu.be/x).,"),
            Some("https://youtu.be/x")
        );
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(
            extract_url("HTTPS://youtu.be/ABC"),
            Some("HTTPS://youtu.be/ABC")
        );
    }

    #[test]
    fn test_never_ends_in_strip_set() {
        for input in [
            "https://a.b/c.",
            "x https://a.b/(c))",
            "https://a.b/c,,,",
            "words https://a.b/c.,)",
        ] {
            let url = extract_url(input).expect("url expected");
            assert!(!url.ends_with([')', '.', ',']), "got {url}");
        }
    }
}
