//! Raw notify events collected during one wake-up.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, event::ModifyKind};

/// Deduplicated, sorted paths touched by one batch of events.
#[derive(Debug, Default)]
pub struct Batch {
    pub paths: BTreeSet<PathBuf>,
    /// The backend dropped events and asks for a rescan.
    pub rescan: bool,
}

impl Batch {
    pub fn add(&mut self, event: Event) {
        if event.need_rescan() {
            self.rescan = true;
        }

        match event.kind {
            EventKind::Access(_) => return,
            // mtime/atime/chmod noise
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            _ => {}
        }

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        self.paths.extend(event.paths.into_iter().filter(|p| !is_temp_file(p)));
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && !self.rescan
    }
}

/// Editor swap/backup files and dot-files.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
