//! Terminal output.
//!
//! Two kinds of lines are written to stdout:
//!
//! - tagged log lines, `[watch] created intro/`, through [`log!`] and
//!   [`debug!`] (the latter only with `--verbose`);
//! - a status block for preview rebuilds, `[12:00:01] ✓ rebuilt intro.md`,
//!   which replaces the previous status block instead of scrolling.

use std::{
    io::{Write, stdout},
    sync::{
        LazyLock,
        atomic::{AtomicBool, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// `log!("tag"; "format", args...)`
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], printed only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let tag = format!("[{module}]");
    let tag = tag.style(tag_style(module));

    let mut out = stdout().lock();
    execute!(out, Clear(ClearType::UntilNewLine)).ok();
    writeln!(out, "{tag} {message}").ok();
    out.flush().ok();
}

fn tag_style(module: &str) -> Style {
    let style = Style::new().bold();
    match module {
        "serve" | "reload" | "launch" => style.bright_blue(),
        "watch" => style.bright_green(),
        "convert" | "sync" => style.bright_magenta(),
        "error" => style.bright_red(),
        "warning" => style.yellow(),
        _ => style.bright_yellow(),
    }
}

// ============================================================================
// Rebuild status
// ============================================================================

static STATUS: LazyLock<Mutex<StatusBlock>> = LazyLock::new(|| Mutex::new(StatusBlock::default()));

/// The most recent rebuild outcome, redrawn in place.
#[derive(Debug, Default)]
struct StatusBlock {
    /// Height of the block currently on screen.
    height: usize,
}

impl StatusBlock {
    fn show(&mut self, mark: String, message: &str) {
        let mut out = stdout().lock();

        if self.height > 0 {
            let up = u16::try_from(self.height).unwrap_or(u16::MAX);
            execute!(out, cursor::MoveUp(up), Clear(ClearType::FromCursorDown)).ok();
        }

        let stamp = format!("[{}]", clock());
        writeln!(out, "{} {mark} {message}", stamp.dimmed()).ok();
        out.flush().ok();

        self.height = height(message);
    }
}

/// UTC wall-clock time as `HH:MM:SS`.
fn clock() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

fn height(message: &str) -> usize {
    message.lines().count().max(1)
}

pub fn status_success(message: &str) {
    STATUS.lock().show("✓".green().to_string(), message);
}

/// `detail` goes below `summary`, omitted when empty.
pub fn status_error(summary: &str, detail: &str) {
    let message = match detail {
        "" => summary.to_string(),
        _ => format!("{summary}\n{detail}"),
    };
    STATUS.lock().show("✗".red().to_string(), &message);
}
