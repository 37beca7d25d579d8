//! Provider identifier syntax.
//!
//! An identifier names a provider's implementation type with its namespace,
//! e.g. `Extensions.Blog.BlogServiceProvider`. Segments may be separated by
//! `.`, `::`, or `\`, and there must be at least two of them.

/// Split an identifier into its namespace segments.
fn segments(identifier: &str) -> Vec<&str> {
    identifier
        .split("::")
        .flat_map(|part| part.split(['.', '\\']))
        .collect()
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `identifier` is a non-empty, namespaced provider identifier.
pub fn is_namespaced(identifier: &str) -> bool {
    let identifier = identifier.trim_start_matches('\\');
    let parts = segments(identifier);
    parts.len() >= 2 && parts.iter().all(|s| is_valid_segment(s))
}
