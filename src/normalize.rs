//! Text normalization applied to every emitted page

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Flatten line breaks, drop `{`/`}` and collapse whitespace.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let flattened = LINE_BREAKS.replace_all(text, " ");
    let unbraced: String = flattened.chars().filter(|c| !matches!(c, '{' | '}')).collect();
    let collapsed = WHITESPACE_RUNS.replace_all(&unbraced, " ");

    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello\n\nWorld {test}   now", "Hello World test now")]
    #[case("", "")]
    #[case("   ", "")]
    #[case("line one\r\nline two", "line one line two")]
    #[case("{}", "")]
    #[case("a { b } c", "a b c")]
    #[case("tab\t\tseparated", "tab separated")]
    #[case("  Ștefan cel Mare  ", "Ștefan cel Mare")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("Hello\n\nWorld {test}   now")]
    #[case(" \n{ }\n ")]
    #[case("single\ttab stays")]
    #[case("mixed \r\n\t { spacing }  \u{a0}\u{a0} here")]
    fn test_normalize_is_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_single_tab_is_preserved() {
        // Only runs of two or more whitespace characters collapse
        assert_eq!(normalize("a\tb"), "a\tb");
    }
}
