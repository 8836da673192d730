//! Joining a host base URL with an endpoint path.

/// Join `host` and `path` with exactly one `/`.
///
/// Strips one trailing slash from `host` and one leading slash from `path`.
/// Nothing else is normalized: no scheme checks, no query handling.
pub fn build_url(host: &str, path: &str) -> String {
    let host = host.strip_suffix('/').unwrap_or(host);
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{host}/{path}")
}
