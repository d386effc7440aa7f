//! `<key:value>` parameter extraction.
//!
//! A key is non-empty and holds no `:`, `<` or `>`. The value runs from the
//! first colon to the closing `>`, may be empty, and may contain raw colons.
//! `\:`, `\<` and `\>` are accepted as escaped literals so that resolved
//! templates may carry those characters inside a value. Job attributes are
//! escaped this way when they are substituted, see [`escape_value`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static RE_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^:<>]+):([^<>]*)>").unwrap());

/// Stand-ins for `\:`, `\<` and `\>` while matching. Cannot appear in resolved
/// callbacks.
const ESCAPED_COLON: char = '\u{0}';
const ESCAPED_LT: char = '\u{1}';
const ESCAPED_GT: char = '\u{2}';

/// Escapes the characters that delimit a parameter so `value` survives
/// [`parse_params`] unchanged.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ':' | '<' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extracts every `<key:value>` pair. A repeated key keeps its last value.
pub fn parse_params(text: &str) -> HashMap<String, String> {
    let masked = text
        .replace(r"\:", &ESCAPED_COLON.to_string())
        .replace(r"\<", &ESCAPED_LT.to_string())
        .replace(r"\>", &ESCAPED_GT.to_string());

    RE_PARAM
        .captures_iter(&masked)
        .map(|caps| (unescape(&caps[1]), unescape(&caps[2])))
        .collect()
}

fn unescape(s: &str) -> String {
    s.replace(ESCAPED_COLON, ":")
        .replace(ESCAPED_LT, "<")
        .replace(ESCAPED_GT, ">")
}
