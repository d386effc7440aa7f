//! Helpers for sanitizing data before it enters log lines and span attributes.
//!
//! Job URLs and callback endpoints may carry credentials in their userinfo or
//! query string; local paths reveal the server layout.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks userinfo and the query string of a URL.
///
/// - `https://user:pw@host/x` → `https://****@host/x`
/// - `https://host/x?token=abc` → `https://host/x?****`
/// - `https://host/x` → unchanged
pub fn redact_url(url: &str) -> String {
    let mut redacted = url.to_string();

    if let Some(scheme_end) = redacted.find("://") {
        let authority_start = scheme_end + 3;
        let authority_end = redacted[authority_start..]
            .find(['/', '?', '#'])
            .map(|i| authority_start + i)
            .unwrap_or(redacted.len());
        if let Some(at_pos) = redacted[authority_start..authority_end].rfind('@') {
            redacted.replace_range(authority_start..authority_start + at_pos, "****");
        }
    }

    if let Some(query_start) = redacted.find('?') {
        let query_end = redacted[query_start..]
            .find('#')
            .map(|i| query_start + i)
            .unwrap_or(redacted.len());
        if query_end > query_start + 1 {
            redacted.replace_range(query_start + 1..query_end, "****");
        }
    }

    redacted
}
