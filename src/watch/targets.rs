//! Registered watch targets.
//!
//! Every directory of the source tree gets its own non-recursive
//! registration, so new directories must be registered explicitly and
//! removed ones deregistered.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};

use crate::builder::all_dirs;

#[derive(Debug, Default)]
pub struct WatchTargets {
    registered: BTreeSet<PathBuf>,
}

impl WatchTargets {
    pub fn contains(&self, dir: &Path) -> bool {
        self.registered.contains(dir)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Register `dir` and every directory below it that is not registered
    /// yet. Returns the newly registered directories, parents first.
    ///
    /// Directories that disappear while registering are skipped; any other
    /// failure is an error.
    pub fn register_tree<W: Watcher>(&mut self, watcher: &mut W, dir: &Path) -> Result<Vec<PathBuf>> {
        let dirs = match all_dirs(dir) {
            Ok(dirs) => dirs,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("cannot walk {}", dir.display())),
        };

        let mut added = Vec::new();
        for dir in dirs {
            if self.registered.contains(&dir) {
                continue;
            }
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.registered.insert(dir.clone());
                    added.push(dir);
                }
                Err(e) if is_vanished(&e) => {
                    crate::debug!("watch"; "vanished before watch: {}", dir.display());
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot watch {}", dir.display()));
                }
            }
        }
        Ok(added)
    }

    /// Deregister `dir` and every target below it.
    pub fn deregister_tree<W: Watcher>(&mut self, watcher: &mut W, dir: &Path) -> Vec<PathBuf> {
        let removed: Vec<_> = self
            .registered
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();

        for path in &removed {
            self.registered.remove(path);
            // The backend usually dropped the watch together with the directory
            let _ = watcher.unwatch(path);
        }
        removed
    }

    /// Bring registrations back in line with the tree under `root` after
    /// the backend lost events.
    pub fn reconcile<W: Watcher>(&mut self, watcher: &mut W, root: &Path) -> Result<Vec<PathBuf>> {
        let stale: Vec<_> = self
            .registered
            .iter()
            .filter(|p| !p.is_dir())
            .cloned()
            .collect();
        for dir in stale {
            self.deregister_tree(watcher, &dir);
        }
        self.register_tree(watcher, root)
    }
}

fn is_vanished(err: &notify::Error) -> bool {
    match &err.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(e) => e.kind() == io::ErrorKind::NotFound,
        _ => false,
    }
}
