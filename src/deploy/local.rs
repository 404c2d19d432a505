//! Publishing into a local directory.
//!
//! ```text
//! <root>/<title>/page.html     markup
//! <root>/<title>/<attachment>  one copy per attachment
//! <root>/<title>/meta.json     { "title", "parent", "hash" }
//! ```
//!
//! `meta.json` is written last, so a page interrupted mid-publish has no
//! hash and gets published again next time.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{PageRecord, Publisher};

const META_FILE: &str = "meta.json";
const MARKUP_FILE: &str = "page.html";

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    title: String,
    parent: Option<String>,
    hash: String,
}

/// A [`Publisher`] whose remote is a directory tree, one directory per title.
#[derive(Debug, Clone)]
pub struct DirPublisher {
    root: PathBuf,
}

impl DirPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn page_dir(&self, title: &str) -> PathBuf {
        self.root.join(title)
    }
}

impl Publisher for DirPublisher {
    fn remote_hash(&mut self, title: &str) -> Result<Option<String>> {
        let path = self.page_dir(title).join(META_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
        };
        let meta: Meta =
            serde_json::from_str(&text).with_context(|| format!("malformed {}", path.display()))?;
        Ok(Some(meta.hash))
    }

    fn publish(&mut self, record: &PageRecord, hash: &str) -> Result<()> {
        let dir = self.page_dir(&record.title);
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

        write(&dir.join(MARKUP_FILE), &record.markup)?;
        for attachment in &record.attachments {
            let Some(name) = attachment.file_name() else {
                continue;
            };
            let target = dir.join(name);
            fs::copy(attachment, &target).with_context(|| {
                format!("cannot copy {} to {}", attachment.display(), target.display())
            })?;
        }

        let meta = Meta {
            title: record.title.clone(),
            parent: record.parent.clone(),
            hash: hash.to_string(),
        };
        let json = serde_json::to_vec_pretty(&meta).context("cannot serialize page metadata")?;
        write(&dir.join(META_FILE), &json)
    }
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
}
