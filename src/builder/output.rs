//! Output locations and page writing.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::launch::LIVE_RELOAD_SNIPPET;
use crate::utils::path::strip_whitespace;

/// Output directory mirroring the parent of `source`.
///
/// `<source_root>/Getting Started/page.md` maps to
/// `<output_root>/GettingStarted`. Returns `None` for paths outside the
/// source tree.
pub fn output_dir_for(source_root: &Path, output_root: &Path, source: &Path) -> Option<PathBuf> {
    let parent = source.parent()?;
    let relative = parent.strip_prefix(source_root).ok()?;
    Some(output_root.join(strip_whitespace(relative)))
}

/// `<output_dir>/<stem>.html`.
pub fn page_path(output_dir: &Path, source: &Path) -> Option<PathBuf> {
    let stem = source.file_stem()?;
    Some(output_dir.join(format!("{}.html", stem.to_string_lossy())))
}

/// Write rendered markup, then append the live-reload snippet.
///
/// The file is truncated first, so rewriting a page with the same markup
/// produces identical bytes.
pub fn write_page(path: &Path, html: &[u8]) -> io::Result<()> {
    fs::write(path, html)?;

    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(LIVE_RELOAD_SNIPPET.as_bytes())
}
