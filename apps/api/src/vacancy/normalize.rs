//! Plain-text normalizer for fetched vacancy pages.
//!
//! Not an HTML parser. Script and style blocks are dropped,
//! every remaining tag becomes a space, `&nbsp;` becomes a space and whitespace is
//! collapsed. Other entities stay as literal text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script.*?</script>").unwrap();
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style.*?</style>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NBSP: Regex = Regex::new(r"(?i)&nbsp;").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Flattens markup into a single line of whitespace-normalized text.
///
/// Never fails; the result may be empty.
pub fn normalize(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = NBSP.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_script_and_decodes_nbsp() {
        let html = "<script>evil()</script><p>Hello&nbsp;World</p>";
        assert_eq!(normalize(html), "Hello World");
    }

    #[test]
    fn test_normalize_script_spanning_lines_case_insensitive() {
        let html = "<SCRIPT type=\"text/javascript\">\nvar a = 1;\n</Script><div>Rust</div>\n<STYLE>\nbody { color: red }\n</style>";
        assert_eq!(normalize(html), "Rust");
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_newlines() {
        let html = "<h1>Senior\n\n  Engineer</h1>\t<ul><li>Rust</li><li>Tokio</li></ul>";
        assert_eq!(normalize(html), "Senior Engineer Rust Tokio");
    }

    #[test]
    fn test_normalize_keeps_other_entities_literal() {
        assert_eq!(normalize("<b>R&amp;D</b>"), "R&amp;D");
    }

    #[test]
    fn test_normalize_nbsp_any_case() {
        assert_eq!(normalize("a&NBSP;b&Nbsp;c"), "a b c");
    }

    #[test]
    fn test_normalize_empty_and_markup_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("<div><span></span></div>"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "<script>evil()</script><p>Hello&nbsp;World</p>",
            "a < b and c > d",
            "<<a>b>",
            "&nb<x>sp; text",
            "  lots   of\n\n space\t ",
            "<scr<x>ipt>evil</script> tail",
            "Вакансия:&nbsp;<b>Разработчик</b>",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("Привет", 3), "При");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
