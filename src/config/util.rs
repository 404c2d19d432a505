//! Configuration utility functions.

use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/docs/src/intro/  ← cwd
/// /home/user/docs/mdpages.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd, config_name)
}

fn find_config_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Resolve a configured path: `~` expansion, then relative to `root`.
///
/// # Examples
/// ```ignore
/// resolve_path(Path::new("src"), Path::new("/docs"))        -> "/docs/src"
/// resolve_path(Path::new("~/notes"), Path::new("/docs"))    -> "$HOME/notes"
/// resolve_path(Path::new("/abs/out"), Path::new("/docs"))   -> "/abs/out"
/// ```
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    };
    let full_path = if expanded.is_relative() {
        root.join(&expanded)
    } else {
        expanded
    };
    normalize_path(&full_path)
}

// ============================================================================
// tests
// ============================================================================
