//! Process-wide state: shutdown signalling and thread supervision.

mod state;
mod supervisor;

pub use state::{ShutdownSignal, register_shutdown, setup_shutdown_handler};
pub use supervisor::Supervisor;
