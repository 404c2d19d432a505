//! Full-tree conversion for publishing.
//!
//! Produces one [`PageRecord`] per page directory, parents before their
//! children. Publishing itself happens behind the [`Publisher`] trait and is
//! skipped for pages whose content hash did not change; [`DirPublisher`]
//! publishes into a local directory.
//!
//! ```text
//! src/Guide/guide.md             → PageRecord { title: "Guide", parent: None }
//! src/Guide/Setup/setup.md       → PageRecord { title: "Setup", parent: Some("Guide") }
//!          Setup/flow.puml       →   attachment out/Guide/Setup/flow.png (if referenced)
//! ```

mod local;

pub use local::DirPublisher;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::builder::{BuildError, Builder, classify_dir, page_dirs};
use crate::render::image_links;
use crate::utils::path::is_external_link;
use crate::{debug, log};

/// Manifest file written by `convert`.
pub const MANIFEST_FILE: &str = "pages.json";

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("cannot read attachment {}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A converted page, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Page directory name.
    pub title: String,
    /// Title of the enclosing page, `None` at the top level.
    pub parent: Option<String>,
    /// Rendered markup, without the live-reload snippet.
    pub markup: Vec<u8>,
    /// Where `markup` was written.
    pub markup_path: PathBuf,
    /// Local images the markup references, in document order.
    pub attachments: Vec<PathBuf>,
}

/// Convert every page directory below the builder's source root.
///
/// Applies the same structural rules as [`Builder::build_all`], but any
/// failure stops the pass: a partially converted tree is never published.
pub fn convert_tree(builder: &Builder) -> Result<Vec<PageRecord>, DeployError> {
    let root = builder.source_root();
    let dirs = page_dirs(root).map_err(|e| BuildError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut titles: FxHashMap<PathBuf, String> = FxHashMap::default();
    let mut records = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let files = classify_dir(&dir, builder.config()).map_err(|e| BuildError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let content = files.single_content(&dir)?;

        for diagram in &files.diagrams {
            builder.build(diagram)?;
        }

        let title = dir_title(&dir);
        let parent = dir.parent().and_then(|p| titles.get(p)).cloned();
        let record = convert_page(builder, content, title.clone(), parent)?;
        debug!("convert"; "{} ({} attachment(s))", record.title, record.attachments.len());

        titles.insert(dir, title);
        records.push(record);
    }

    Ok(records)
}

fn convert_page(
    builder: &Builder,
    content: &Path,
    title: String,
    parent: Option<String>,
) -> Result<PageRecord, DeployError> {
    let io_err = |path: &Path, source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    };

    let source = fs::read(content).map_err(|e| io_err(content, e))?;
    let markup = builder
        .markup()
        .render_markup(&source)
        .map_err(|e| BuildError::Render {
            path: content.to_path_buf(),
            source: e.into(),
        })?;

    let out_dir = builder
        .output_dir_for(content)
        .ok_or_else(|| io_err(content, io::Error::other("outside the source tree")))?;
    fs::create_dir_all(&out_dir).map_err(|e| io_err(&out_dir, e))?;

    let attachments = attachments(&String::from_utf8_lossy(&source), &out_dir)?;

    let markup_path = out_dir.join(format!("{}.fragment.html", file_stem(content)));
    fs::write(&markup_path, &markup).map_err(|e| io_err(&markup_path, e))?;

    Ok(PageRecord {
        title,
        parent,
        markup,
        markup_path,
        attachments,
    })
}

/// Local image references resolved against the page's output directory.
fn attachments(source: &str, out_dir: &Path) -> Result<Vec<PathBuf>, DeployError> {
    let mut found: Vec<PathBuf> = Vec::new();
    for link in image_links(source) {
        if link.is_empty() || is_external_link(&link) {
            continue;
        }

        let path = out_dir.join(link.trim_start_matches("./"));
        fs::File::open(&path).map_err(|source| DeployError::Attachment {
            path: path.clone(),
            source,
        })?;
        if !found.contains(&path) {
            found.push(path);
        }
    }
    Ok(found)
}

fn dir_title(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Content hash
// ============================================================================

/// `blake3` over the markup and every attachment's file name and bytes,
/// hex encoded.
pub fn content_hash(record: &PageRecord) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&record.markup);

    for attachment in &record.attachments {
        let name = attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        hasher.update(name.as_bytes());
        hasher.update(&fs::read(attachment)?);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}

// ============================================================================
// Publishing
// ============================================================================

/// Remote side of publishing.
pub trait Publisher {
    /// Hash stored with the published page, `None` if it does not exist.
    fn remote_hash(&mut self, title: &str) -> Result<Option<String>>;

    /// Create or update the page and store `hash` with it.
    fn publish(&mut self, record: &PageRecord, hash: &str) -> Result<()>;
}

/// Titles per outcome of a [`sync`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub published: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Publish every record whose content hash differs from the remote one.
///
/// Records are published in order, so parents exist before their children.
pub fn sync(records: &[PageRecord], publisher: &mut dyn Publisher) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for record in records {
        let hash = content_hash(record)
            .with_context(|| format!("cannot hash page {}", record.title))?;

        let remote = publisher
            .remote_hash(&record.title)
            .with_context(|| format!("cannot look up page {}", record.title))?;
        if remote.as_deref() == Some(hash.as_str()) {
            debug!("sync"; "{} unchanged", record.title);
            report.unchanged.push(record.title.clone());
            continue;
        }

        publisher
            .publish(record, &hash)
            .with_context(|| format!("cannot publish page {}", record.title))?;
        log!("sync"; "{} {}", if remote.is_some() { "updated" } else { "created" }, record.title);
        report.published.push(record.title.clone());
    }

    Ok(report)
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Serialize)]
struct ManifestEntry<'a> {
    title: &'a str,
    parent: Option<&'a str>,
    hash: String,
    markup: &'a Path,
    attachments: &'a [PathBuf],
}

/// Write a JSON manifest describing `records` to `path`.
pub fn write_manifest(records: &[PageRecord], path: &Path) -> Result<()> {
    let entries = records
        .iter()
        .map(|record| {
            Ok(ManifestEntry {
                title: &record.title,
                parent: record.parent.as_deref(),
                hash: content_hash(record)
                    .with_context(|| format!("cannot hash page {}", record.title))?,
                markup: &record.markup_path,
                attachments: &record.attachments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let json = serde_json::to_string_pretty(&entries).context("cannot serialize manifest")?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
