//! Path prefix matching.
//!
//! # Design Decisions
//! - Plain, case-sensitive string prefixes (no regex in the hot path)
//! - Longest prefix wins; equal lengths keep the earlier declaration
//! - O(n) scan over the snapshot's rules, acceptable for typical route counts

use crate::snapshot::types::RouteRule;

/// Find the rule with the longest `path_prefix` that prefixes `path`.
///
/// Returns the rule's index in declaration order alongside the rule.
pub fn longest_prefix_match<'a>(routes: &'a [RouteRule], path: &str) -> Option<(usize, &'a RouteRule)> {
    let mut best: Option<(usize, &RouteRule)> = None;

    for (index, rule) in routes.iter().enumerate() {
        if !path.starts_with(rule.path_prefix.as_str()) {
            continue;
        }
        // Strictly longer only: ties keep the earliest rule.
        let longer = best
            .map(|(_, current)| rule.path_prefix.len() > current.path_prefix.len())
            .unwrap_or(true);
        if longer {
            best = Some((index, rule));
        }
    }

    best
}

/// Path left after removing the matched prefix, always absolute.
pub fn strip_matched_prefix<'a>(path: &'a str, prefix: &str) -> std::borrow::Cow<'a, str> {
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    if rest.starts_with('/') {
        std::borrow::Cow::Borrowed(rest)
    } else {
        std::borrow::Cow::Owned(format!("/{}", rest))
    }
}

/// True when any segment is `.` or `..`, plain or percent-encoded.
pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.replace("%2e", ".").replace("%2E", ".");
        decoded == "." || decoded == ".."
    })
}
