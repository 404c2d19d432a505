//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `strip_whitespace` - drop whitespace from every segment of a relative path
//! - `is_hidden` - dot-prefixed file or directory name

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Remove all whitespace from each segment of a relative path.
///
/// Served URLs never need percent-encoded spaces this way:
/// `Getting Started/First Steps` becomes `GettingStarted/FirstSteps`.
/// Segments that are whitespace-only disappear.
pub fn strip_whitespace(relative: &Path) -> PathBuf {
    relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_string_lossy()
                .chars()
                .filter(|ch| !ch.is_whitespace())
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Check if a file or directory name starts with a dot.
#[inline]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_strip_whitespace_segments() {
        assert_eq!(
            strip_whitespace(Path::new("Getting Started/First  Steps")),
            PathBuf::from("GettingStarted/FirstSteps")
        );
        assert_eq!(
            strip_whitespace(Path::new("tabs\tand\nnewlines")),
            PathBuf::from("tabsandnewlines")
        );
    }

    #[test]
    fn test_strip_whitespace_noop() {
        assert_eq!(strip_whitespace(Path::new("intro")), PathBuf::from("intro"));
        assert_eq!(strip_whitespace(Path::new("")), PathBuf::new());
    }

    #[test]
    fn test_strip_whitespace_drops_blank_segment() {
        assert_eq!(strip_whitespace(Path::new("a/ /b")), PathBuf::from("a/b"));
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(Path::new("/src/.git")));
        assert!(is_hidden(Path::new(".intro.md.swp")));
        assert!(!is_hidden(Path::new("/src/intro")));
    }
}
