//! `/`-separated path helpers for remote filesystems.
//!
//! Remote paths are plain strings, never `std::path::Path`: the separator is
//! always `/` regardless of the host platform.

pub const SEPARATOR: char = '/';

/// Joins `segment` onto `base`, collapsing duplicate separators at the seam.
///
/// An empty `base` yields the segment alone, so joining onto a relative root
/// never produces a spurious leading separator.
pub fn join_path(base: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches(SEPARATOR);
    if base.is_empty() {
        return segment.to_string();
    }
    if segment.is_empty() {
        return base.to_string();
    }
    if base.ends_with(SEPARATOR) {
        format!("{}{}", base, segment)
    } else {
        format!("{}{}{}", base, SEPARATOR, segment)
    }
}

/// Joins every segment onto `base` in order.
pub fn join_all<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    segments
        .iter()
        .fold(base.to_string(), |acc, segment| join_path(&acc, segment.as_ref()))
}

/// Collapses empty segments and trailing separators. A leading separator is kept.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with(SEPARATOR);
    let joined = path
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Every cumulative prefix of `path`, root to leaf.
///
/// `"/data//cache/joblib"` yields `["/data", "/data/cache", "/data/cache/joblib"]`.
pub fn cumulative_prefixes(path: &str) -> Vec<String> {
    let mut current = if path.starts_with(SEPARATOR) {
        SEPARATOR.to_string()
    } else {
        String::new()
    };

    path.split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            current = join_path(&current, segment);
            current.clone()
        })
        .collect()
}

/// Removes exactly one leading separator, if present.
pub fn strip_leading_separator(path: &str) -> &str {
    path.strip_prefix(SEPARATOR).unwrap_or(path)
}

/// Parent directory of `path`, or `None` at a root.
pub fn parent(path: &str) -> Option<String> {
    let normalized = normalize(path);
    let trimmed = normalized.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(0) if trimmed.len() > 1 => Some("/".to_string()),
        Some(0) => None,
        Some(index) => Some(trimmed[..index].to_string()),
        None if trimmed.is_empty() => None,
        None => Some(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "data"), "data");
        assert_eq!(join_path("data", "joblib"), "data/joblib");
        assert_eq!(join_path("data/", "joblib"), "data/joblib");
        assert_eq!(join_path("/", "data"), "/data");
        assert_eq!(join_path("data", ""), "data");
        assert_eq!(join_path("data", "/joblib"), "data/joblib");
    }

    #[test]
    fn test_join_all() {
        assert_eq!(
            join_all("data/joblib", &["module", "func", "abc123"]),
            "data/joblib/module/func/abc123"
        );
        let empty: [&str; 0] = [];
        assert_eq!(join_all("data/joblib", &empty), "data/joblib");
    }

    #[test]
    fn test_cumulative_prefixes_relative() {
        assert_eq!(
            cumulative_prefixes("data/cache/joblib"),
            vec!["data", "data/cache", "data/cache/joblib"]
        );
    }

    #[test]
    fn test_cumulative_prefixes_skips_empty_segments() {
        assert_eq!(
            cumulative_prefixes("/data//cache/"),
            vec!["/data", "/data/cache"]
        );
        assert!(cumulative_prefixes("").is_empty());
        assert!(cumulative_prefixes("/").is_empty());
    }

    #[test]
    fn test_strip_leading_separator_strips_once() {
        assert_eq!(strip_leading_separator("/data"), "data");
        assert_eq!(strip_leading_separator("//data"), "/data");
        assert_eq!(strip_leading_separator("data"), "data");
    }

    #[test]
    fn test_normalize_and_parent() {
        assert_eq!(normalize("/a//b/"), "/a/b");
        assert_eq!(normalize("a/b"), "a/b");
        assert_eq!(parent("a/b"), Some("a".to_string()));
        assert_eq!(parent("/a"), Some("/".to_string()));
        assert_eq!(parent("a"), Some(String::new()));
        assert_eq!(parent("/"), None);
        assert_eq!(parent(""), None);
    }
}
