//! Deterministic output names from `%(field)s` templates.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::MediaInfo;

static RE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([A-Za-z0-9_]+)\)[sd]").unwrap());

/// Rendered in place of fields the extractor did not report.
const MISSING: &str = "NA";

/// Renders a naming template such as `%(extractor)s_%(title)s.%(ext)s`.
///
/// The result only contains `[A-Za-z0-9._-]`, so it is safe as a bare file name.
pub fn render_filename(template: &str, info: &MediaInfo) -> String {
    let rendered = RE_FIELD.replace_all(template, |caps: &Captures| {
        info.field(&caps[1]).unwrap_or_else(|| MISSING.to_string())
    });

    let name = sanitize_filename(&rendered);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return MISSING.to_string();
    }
    name
}

fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }

    collapsed.trim_matches('_').to_string()
}
