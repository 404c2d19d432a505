//! Directory watcher.
//!
//! Watches every directory of the source tree and forwards changed files to
//! the [`Coordinator`].
//!
//! ```text
//! notify ──► Batch (drain, dedup, sort) ──► dir?  register + forward its files
//!                                          file?  Coordinator::submit
//!                                          gone?  deregister + discard pending
//! ```
//!
//! The watcher only tells files from directories; deciding what a file
//! builds into is the builder's job.

mod batch;
mod targets;

#[cfg(test)]
mod tests;

pub use batch::is_temp_file;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver};
use notify::RecommendedWatcher;

use batch::Batch;
use targets::WatchTargets;

use crate::builder::files_in;
use crate::coordinator::Coordinator;
use crate::core::ShutdownSignal;
use crate::{debug, log};

pub struct DirWatcher {
    root: PathBuf,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    events: Receiver<notify::Result<notify::Event>>,
    targets: WatchTargets,
    coordinator: Coordinator,
}

impl DirWatcher {
    /// Register every directory under `root`.
    ///
    /// Events start buffering immediately, so changes made while the caller
    /// runs the initial build are not lost.
    pub fn new(root: &Path, coordinator: Coordinator) -> Result<Self> {
        let (tx, events) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("cannot create file watcher")?;

        let mut targets = WatchTargets::default();
        targets.register_tree(&mut watcher, root)?;
        if !targets.contains(root) {
            return Err(anyhow!("source directory {} disappeared", root.display()));
        }
        log!("watch"; "watching {} ({} directories)", root.display(), targets.len());

        Ok(Self {
            root: root.to_path_buf(),
            watcher,
            events,
            targets,
            coordinator,
        })
    }

    /// Run until shutdown.
    ///
    /// Returns an error when the watch handle breaks or an existing
    /// directory cannot be registered.
    pub fn run(mut self, shutdown: &ShutdownSignal) -> Result<()> {
        loop {
            let first = crossbeam::select! {
                recv(self.events) -> msg => msg.map_err(|_| anyhow!("file watcher disconnected"))?,
                recv(shutdown.receiver()) -> _ => return Ok(()),
            };

            let mut batch = Batch::default();
            batch.add(first.context("file watcher failed")?);
            while let Ok(res) = self.events.try_recv() {
                batch.add(res.context("file watcher failed")?);
            }

            if !batch.is_empty() {
                self.process(batch)?;
            }
        }
    }

    fn process(&mut self, batch: Batch) -> Result<()> {
        if batch.rescan {
            log!("watch"; "event queue overflowed, rescanning {}", self.root.display());
            for dir in self.targets.reconcile(&mut self.watcher, &self.root)? {
                log!("watch"; "watching {}", dir.display());
            }
        }

        for path in batch.paths {
            if path.is_dir() {
                self.on_dir(&path)?;
            } else if path.is_file() {
                self.forward(path);
            } else if self.targets.contains(&path) {
                self.on_removed_dir(&path);
            }
        }
        Ok(())
    }

    /// Register a new directory tree and forward files already inside it.
    fn on_dir(&mut self, dir: &Path) -> Result<()> {
        for added in self.targets.register_tree(&mut self.watcher, dir)? {
            log!("watch"; "watching {}", added.display());

            // Written before the registration took effect
            match files_in(&added) {
                Ok(files) => files
                    .into_iter()
                    .filter(|f| !is_temp_file(f))
                    .for_each(|f| self.forward(f)),
                Err(e) => debug!("watch"; "cannot list {}: {}", added.display(), e),
            }
        }
        Ok(())
    }

    fn on_removed_dir(&mut self, dir: &Path) {
        let removed = self.targets.deregister_tree(&mut self.watcher, dir);
        let discarded = self.coordinator.discard_under(dir);
        log!("watch"; "stopped watching {} ({} directories, {} pending dropped)",
            dir.display(), removed.len(), discarded);
    }

    fn forward(&self, path: PathBuf) {
        debug!("watch"; "changed {}", path.display());
        self.coordinator.submit(path);
    }
}
