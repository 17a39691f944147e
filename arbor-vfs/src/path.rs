//! Path algebra for `/`-joined store paths.
//!
//! A path is a sequence of non-empty segments joined by `/`. The empty
//! string is the store root. Paths never carry a leading slash once
//! normalized; trailing slashes are not stripped.

// ── Constants ───────────────────────────────────────────────────────────────

pub const ROOT: &str = "";
pub const SEPARATOR: char = '/';

// ── Limits ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsLimits {
    pub max_path_depth: usize,
    pub max_name_length: usize,
    pub max_node_count: usize,
}

impl Default for VfsLimits {
    fn default() -> Self {
        Self {
            max_path_depth: 32,
            max_name_length: 255,
            max_node_count: 10_000,
        }
    }
}

impl VfsLimits {
    pub fn unlimited() -> Self {
        Self {
            max_path_depth: usize::MAX,
            max_name_length: usize::MAX,
            max_node_count: usize::MAX,
        }
    }
}

// ── Path functions ──────────────────────────────────────────────────────────

/// Strip leading slashes. Idempotent.
pub fn normalize(path: &str) -> &str {
    path.trim_start_matches(SEPARATOR)
}

/// All segments except the last. The parent of a single-segment path (and
/// of the root itself) is the root.
pub fn parent_path(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(pos) => &path[..pos],
        None => ROOT,
    }
}

/// The last segment, or the empty string for the root.
pub fn base_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// True iff `candidate` is a strict, segment-aligned prefix of `path`.
/// A path is never its own ancestor; the root is an ancestor of every
/// other path.
pub fn is_ancestor(path: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return !path.is_empty();
    }
    path.len() > candidate.len()
        && path.starts_with(candidate)
        && path.as_bytes()[candidate.len()] == b'/'
}

/// Join a child name (or relative suffix) onto `base`.
pub fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        base.to_string()
    } else {
        format!("{}{}{}", base, SEPARATOR, rest)
    }
}

/// Replace the `from` prefix of `path` with `to` when `path` is `from` or
/// lies beneath it; otherwise return `path` unchanged.
pub fn rebase(path: &str, from: &str, to: &str) -> String {
    if path == from {
        return to.to_string();
    }
    if !is_ancestor(path, from) {
        return path.to_string();
    }
    let suffix = if from.is_empty() {
        path
    } else {
        &path[from.len() + 1..]
    };
    join(to, suffix)
}

/// Number of segments. The root has depth 0.
pub fn path_depth(path: &str) -> usize {
    if path.is_empty() {
        return 0;
    }
    path.split(SEPARATOR).count()
}

/// Every proper ancestor of `path`, from the root down to its parent.
pub fn ancestor_paths(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut result = vec![ROOT.to_string()];
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    for i in 1..segments.len() {
        result.push(segments[..i].join("/"));
    }
    result
}

fn has_forbidden_chars(segment: &str) -> bool {
    segment.bytes().any(|b| b <= 0x1f || b == b'\\')
}

/// Validate a single path segment. Returns `Some(error_message)` if invalid.
pub fn validate_segment(segment: &str, max_name_length: usize) -> Option<String> {
    if segment.is_empty() {
        return Some("Path segment cannot be empty".to_string());
    }
    if segment.len() > max_name_length {
        return Some(format!(
            "Path segment exceeds max name length ({})",
            max_name_length
        ));
    }
    if has_forbidden_chars(segment) {
        return Some("Path segment contains forbidden characters".to_string());
    }
    None
}

/// Validate a normalized path against limits. Returns `Some(error_message)`
/// if invalid. The root is always valid.
pub fn validate_path(path: &str, limits: &VfsLimits) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let depth = path_depth(path);
    if depth > limits.max_path_depth {
        return Some(format!("Path exceeds max depth ({})", limits.max_path_depth));
    }
    path.split(SEPARATOR)
        .find_map(|seg| validate_segment(seg, limits.max_name_length))
}

// ── Tests ───────────────────────────────────────────────────────────────────
