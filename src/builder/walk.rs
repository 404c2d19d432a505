//! Source tree traversal.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::config::BuildSectionConfig;
use crate::utils::path::is_hidden;

/// Files of one page directory, each list sorted.
#[derive(Debug, Default)]
pub struct DirFiles {
    pub content: Vec<PathBuf>,
    pub diagrams: Vec<PathBuf>,
}

/// Every directory below `root` (root excluded), depth first, siblings in
/// name order. Hidden directories and everything under them are skipped.
pub fn page_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut children = subdirs(&dir)?;
        // Reverse so the smallest name is popped first
        children.reverse();
        stack.extend(children);
        if dir != root {
            dirs.push(dir);
        }
    }
    Ok(dirs)
}

/// Every directory at or below `root`, hidden ones excluded.
pub fn all_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = vec![root.to_path_buf()];
    dirs.extend(page_dirs(root)?);
    Ok(dirs)
}

/// Visible regular files directly inside `dir`, sorted.
pub fn files_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Split the files of `dir` into page content and diagram sources.
pub fn classify_dir(dir: &Path, build: &BuildSectionConfig) -> io::Result<DirFiles> {
    let mut files = DirFiles::default();
    for path in files_in(dir)? {
        if build.is_content(&path) {
            files.content.push(path);
        } else if build.is_diagram(&path) {
            files.diagrams.push(path);
        }
    }
    Ok(files)
}

fn subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
