//! Translation between logical volume paths and the browse wire format.
//!
//! Callers address directories as `/`-rooted paths. The `get-dir` query
//! instead expects an empty string for the root and no leading slash
//! elsewhere; sending `/` makes the backend look for a directory literally
//! named `/`.

/// Convert a logical directory path to the `dir` parameter.
#[must_use]
pub fn wire_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    trimmed.strip_prefix('/').unwrap_or(trimmed).to_string()
}

/// Canonical `/`-rooted form of a directory path, without trailing slash.
#[must_use]
pub fn logical_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Full path of `name` inside directory `dir`.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    let dir = logical_dir(dir);
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Split a path into its parent directory and final component.
///
/// Returns `None` for the root, which has no parent.
#[must_use]
pub fn split_parent(path: &str) -> Option<(String, String)> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.rfind('/') {
        Some(0) => Some(("/".to_string(), trimmed[1..].to_string())),
        Some(idx) => Some((trimmed[..idx].to_string(), trimmed[idx + 1..].to_string())),
        None => Some(("/".to_string(), trimmed.to_string())),
    }
}
