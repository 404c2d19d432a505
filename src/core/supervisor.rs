//! Named background threads with collected results.
//!
//! Every task gets a clone of the [`ShutdownSignal`]. The first task to
//! finish (successfully or not) triggers shutdown for the rest, then
//! [`Supervisor::wait`] joins all threads in spawn order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use crossbeam::channel::{self, Receiver, Sender};

use super::ShutdownSignal;
use crate::debug;

type Done = (&'static str, Result<()>);

pub struct Supervisor {
    shutdown: ShutdownSignal,
    done_tx: Sender<Done>,
    done_rx: Receiver<Done>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        let (done_tx, done_rx) = channel::unbounded();
        Self {
            shutdown,
            done_tx,
            done_rx,
            handles: Vec::new(),
        }
    }

    /// Spawn a named task thread.
    ///
    /// A panic inside the task is reported as that task's error.
    pub fn spawn<F>(&mut self, name: &'static str, task: F) -> Result<()>
    where
        F: FnOnce(ShutdownSignal) -> Result<()> + Send + 'static,
    {
        let signal = self.shutdown.clone();
        let done = self.done_tx.clone();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| task(signal)))
                    .unwrap_or_else(|_| Err(anyhow!("{name} thread panicked")));
                let _ = done.send((name, result));
            })
            .with_context(|| format!("failed to spawn {name} thread"))?;

        self.handles.push((name, handle));
        Ok(())
    }

    /// Block until shutdown is triggered or any task finishes, then stop and
    /// join everything.
    ///
    /// Returns the first task error, named after its task.
    pub fn wait(self) -> Result<()> {
        let Self {
            shutdown,
            done_tx,
            done_rx,
            handles,
        } = self;
        drop(done_tx);

        if handles.is_empty() {
            return Ok(());
        }

        let mut results = Vec::with_capacity(handles.len());
        crossbeam::select! {
            recv(done_rx) -> msg => {
                if let Ok(done) = msg {
                    results.push(done);
                }
            }
            recv(shutdown.receiver()) -> _ => {}
        }
        shutdown.trigger();

        for (name, handle) in handles {
            if handle.join().is_err() {
                debug!("supervisor"; "{} thread did not exit cleanly", name);
            }
        }
        results.extend(done_rx.try_iter());

        for (name, result) in &results {
            debug!("supervisor"; "{} finished: {}", name, if result.is_ok() { "ok" } else { "error" });
        }

        match results.into_iter().find(|(_, r)| r.is_err()) {
            Some((name, Err(e))) => Err(e.context(format!("{name} stopped"))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_failed_task_stops_the_rest() {
        let mut supervisor = Supervisor::new(ShutdownSignal::new());
        let stopped = Arc::new(AtomicUsize::new(0));

        let counter = stopped.clone();
        supervisor
            .spawn("worker", move |shutdown| {
                while shutdown.sleep(Duration::from_millis(5)) {}
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        supervisor
            .spawn("watcher", |_| Err(anyhow!("watch handle broken")))
            .unwrap();

        let err = supervisor.wait().unwrap_err();
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(format!("{err:#}").contains("watcher stopped"));
        assert!(format!("{err:#}").contains("watch handle broken"));
    }

    #[test]
    fn test_external_shutdown() {
        let signal = ShutdownSignal::new();
        let mut supervisor = Supervisor::new(signal.clone());
        supervisor
            .spawn("worker", |shutdown| {
                while shutdown.sleep(Duration::from_millis(5)) {}
                Ok(())
            })
            .unwrap();

        signal.trigger();
        assert!(supervisor.wait().is_ok());
    }

    #[test]
    fn test_panic_reported() {
        let mut supervisor = Supervisor::new(ShutdownSignal::new());
        supervisor
            .spawn("broken", |_| -> Result<()> { panic!("boom") })
            .unwrap();

        let err = supervisor.wait().unwrap_err();
        assert!(format!("{err:#}").contains("broken thread panicked"));
    }

    #[test]
    fn test_no_tasks() {
        let supervisor = Supervisor::new(ShutdownSignal::new());
        assert!(supervisor.wait().is_ok());
    }
}
