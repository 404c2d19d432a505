//! Platform page viewer.

use anyhow::Result;

use crate::utils::exec::Cmd;

/// Opens a URL for the user to look at.
pub trait Viewer: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// The desktop's default browser.
///
/// - macOS: `open`
/// - Windows: `cmd /C start`
/// - others: `xdg-open`
///
/// The opener runs detached from our stdio and only the opener itself is
/// waited for, never the browser it may start.
pub struct SystemViewer {
    command: Vec<String>,
}

impl Default for SystemViewer {
    fn default() -> Self {
        let command: &[&str] = if cfg!(target_os = "macos") {
            &["open"]
        } else if cfg!(target_os = "windows") {
            &["cmd", "/C", "start"]
        } else {
            &["xdg-open"]
        };
        Self::with_command(command.iter().map(|s| s.to_string()).collect())
    }
}

impl SystemViewer {
    /// Opener program and leading arguments; the URL is appended.
    pub fn with_command(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Viewer for SystemViewer {
    fn open(&self, url: &str) -> Result<()> {
        Cmd::from_slice(&self.command).arg(url).spawn_detached()
    }
}
