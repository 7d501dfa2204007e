//! Helpers over the untyped invitation configuration
//!
//! The configuration is an arbitrarily nested JSON document. Fields are
//! addressed with dotted paths such as `text.couple.brideFullName`.

use serde_json::Value;

/// Invitation configuration as submitted by the builder form
pub type InvitationConfig = Value;

/// Resolve a dotted path against a configuration tree
///
/// Numeric segments index into arrays, every other segment is an object key.
pub fn lookup<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(config, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) if is_index(segment) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    })
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Whitespace as defined by `String.prototype.trim` in the browser.
///
/// Differs from `char::is_whitespace` on U+0085 and U+FEFF.
pub fn is_js_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// Trim a string exactly like the client bundle does
pub fn js_trim(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

/// Resolve a dotted path to a non-blank string
///
/// Only string values count; blank strings are treated as absent so that an
/// emptied form field falls back the same way a missing one does.
pub fn lookup_str<'a>(config: &'a Value, path: &str) -> Option<&'a str> {
    lookup(config, path)
        .and_then(Value::as_str)
        .map(js_trim)
        .filter(|s| !s.is_empty())
}

/// Collect every non-blank string of an array found at `path`
pub fn lookup_str_list(config: &Value, path: &str) -> Vec<String> {
    match lookup(config, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(js_trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
