//! Shutdown state for preview mode.
//!
//! - [`ShutdownSignal`]: channel-based signal that blocking waits can select on
//! - `SIGNAL`: the signal Ctrl+C triggers, once registered

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

/// Signal triggered by the Ctrl+C handler once preview mode is running
static SIGNAL: OnceLock<ShutdownSignal> = OnceLock::new();

// =============================================================================
// ShutdownSignal
// =============================================================================

/// Cloneable shutdown signal.
///
/// Backed by a channel that never carries a message: triggering drops the
/// only sender, which disconnects every receiver at once. Blocking waits add
/// [`ShutdownSignal::receiver`] to their `select!` and stop when it fires.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<Mutex<Option<Sender<()>>>>,
    rx: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            rx,
        }
    }

    /// Trigger shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) on shutdown.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// Sleep for `duration` unless shutdown arrives first.
    ///
    /// Returns `false` if woken by shutdown.
    pub fn sleep(&self, duration: Duration) -> bool {
        // Only ever disconnects, so anything but a timeout is the shutdown case
        matches!(
            self.rx.recv_timeout(duration),
            Err(channel::RecvTimeoutError::Timeout)
        )
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Ctrl+C handling
// =============================================================================

/// Setup the global Ctrl+C handler. Call once at program start
///
/// The handler behavior depends on whether a signal has been registered:
/// - Before `register_shutdown()`: Exit immediately (nothing to wind down)
/// - After `register_shutdown()`: Trigger the signal for a graceful shutdown
/// - Once triggered: Exit immediately
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        match SIGNAL.get() {
            // Second Ctrl+C while winding down
            Some(signal) if signal.is_triggered() => std::process::exit(130),
            Some(signal) => {
                crate::log!("serve"; "shutting down... (Ctrl+C again to force)");
                signal.trigger();
            }
            None => std::process::exit(0),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the signal Ctrl+C should trigger.
///
/// Call this before starting long-running threads.
pub fn register_shutdown(signal: &ShutdownSignal) {
    let _ = SIGNAL.set(signal.clone());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_signal_trigger() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_triggered());

        signal.trigger();
        assert!(signal.is_triggered());

        // Idempotent
        signal.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_signal_shared_between_clones() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();

        clone.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_sleep_completes() {
        let signal = ShutdownSignal::new();
        assert!(signal.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_sleep_interrupted() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            trigger.trigger();
        });

        let start = Instant::now();
        assert!(!signal.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
