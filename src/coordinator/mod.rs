//! Change coordinator.
//!
//! Turns bursty change notifications into a minimal ordered sequence of
//! builds:
//!
//! ```text
//! Watcher ──submit(path)──► pending set + queue ──► Worker ──► JobRunner
//!           (any thread)    (dedup under one lock)  (one at a time, debounced)
//! ```
//!
//! A path is pending from `submit` until its job starts, so repeated saves
//! of the same file before the worker gets to it collapse into one build.
//! Consecutive builds start at least one debounce interval apart.


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::core::ShutdownSignal;
use crate::{debug, log};

/// Executes one build job.
///
/// Errors are logged and the worker moves on, unless they are [`Fatal`].
pub trait JobRunner: Send {
    fn run(&mut self, path: &Path) -> Result<()>;
}

/// A job error that stops the worker; [`Worker::run`] returns it.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Fatal(pub anyhow::Error);

struct Shared {
    pending: Mutex<FxHashSet<PathBuf>>,
    queue: Sender<PathBuf>,
}

/// Submission handle. Cheap to clone, safe to use from any thread.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

/// Consuming side, run on the worker thread.
pub struct Worker {
    shared: Arc<Shared>,
    queue: Receiver<PathBuf>,
    debounce: Duration,
    last_build: Instant,
}

impl Coordinator {
    pub fn new(debounce: Duration) -> (Self, Worker) {
        let (tx, rx) = channel::unbounded();
        let shared = Arc::new(Shared {
            pending: Mutex::new(FxHashSet::default()),
            queue: tx,
        });

        let worker = Worker {
            shared: shared.clone(),
            queue: rx,
            debounce,
            last_build: Instant::now(),
        };
        (Self { shared }, worker)
    }

    /// Queue `path` unless it is already pending.
    ///
    /// Returns whether a new job was queued.
    pub fn submit(&self, path: PathBuf) -> bool {
        let mut pending = self.shared.pending.lock();
        if pending.contains(&path) {
            return false;
        }
        // Enqueue under the lock so queue order matches insertion order
        if self.shared.queue.send(path.clone()).is_err() {
            return false;
        }
        pending.insert(path);
        true
    }

    /// Drop pending jobs for `dir` and everything below it.
    ///
    /// Their queue entries stay behind and are skipped when dequeued.
    pub fn discard_under(&self, dir: &Path) -> usize {
        let mut pending = self.shared.pending.lock();
        let before = pending.len();
        pending.retain(|path| !path.starts_with(dir));
        before - pending.len()
    }

    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

impl Worker {
    /// Process jobs until shutdown or until every [`Coordinator`] is dropped.
    pub fn run<R: JobRunner>(mut self, runner: &mut R, shutdown: &ShutdownSignal) -> Result<()> {
        loop {
            let path = crossbeam::select! {
                recv(self.queue) -> msg => match msg {
                    Ok(path) => path,
                    Err(_) => return Ok(()),
                },
                recv(shutdown.receiver()) -> _ => return Ok(()),
            };

            if self.last_build.elapsed() < self.debounce && !shutdown.sleep(self.debounce) {
                return Ok(());
            }

            if !self.shared.pending.lock().remove(&path) {
                debug!("watch"; "discarded {}", path.display());
                continue;
            }
            if !path.exists() {
                debug!("watch"; "vanished {}", path.display());
                continue;
            }

            if let Err(e) = runner.run(&path) {
                if e.is::<Fatal>() {
                    return Err(e);
                }
                log!("error"; "{}: {:#}", path.display(), e);
            }
            self.last_build = Instant::now();
        }
    }
}
