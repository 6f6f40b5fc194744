//! URL path canonicalization.
//!
//! Pattern matching against a raw request path can be evaded with crafted
//! `.`/`..`/empty segments (`/configSubmit/../configSubmit` and friends), so
//! every path is normalized here before it reaches the audit pattern gate.

/// Canonicalizes a raw request path.
///
/// Splits on runs of `/`, drops empty and `.` segments, and resolves `..`
/// against the preceding retained segment. A `..` with nothing before it is
/// dropped silently: a path that tries to break out of the root is flattened,
/// not rejected. Leading and trailing slashes of the input are preserved.
///
/// This is a total function; degenerate input produces `""` or `"/"`.
///
/// # Examples
///
/// ```
/// use aletheia_core::canonicalize;
///
/// assert_eq!(canonicalize("/job//test/./configSubmit"), "/job/test/configSubmit");
/// assert_eq!(canonicalize("/job/../configSubmit"), "/configSubmit");
/// assert_eq!(canonicalize("/../.."), "/");
/// ```
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let leading = raw.starts_with('/');
    let trailing = raw.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(raw.len());
    if leading {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}
