//! Running the external helpers: the diagram renderer and the page viewer.
//!
//! ```ignore
//! Cmd::from_slice(&config.render.plantuml)   // e.g. ["java", "-jar", "plantuml.jar"]
//!     .args(["-tpng", "-o"])
//!     .arg(output_dir)
//!     .arg(source)
//!     .noise(&PLANTUML_NOISE)
//!     .run()?;
//! ```
//!
//! Stderr of a successful run is logged under the program's name, minus the
//! lines a [`Noise`] table marks as uninteresting. A failed run becomes an
//! error holding the exit status and whatever the process printed.
//!
//! Helpers that may leave a long-lived child behind (a browser started by
//! `xdg-open`) go through [`Cmd::spawn_detached`] instead: no pipes are
//! shared with them, so nothing waits for the grandchild.

use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    process::{Command, Output, Stdio},
    sync::LazyLock,
};

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::log;

/// A program and its arguments, built up before running.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    noise: Option<&'static Noise>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// First element is the program, the rest are leading arguments.
    pub fn from_slice<S: AsRef<OsStr>>(command: &[S]) -> Self {
        match command.split_first() {
            Some((program, rest)) => Self::new(program).args(rest),
            None => Self::default(),
        }
    }

    /// Empty arguments are dropped.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, Self::arg)
    }

    pub fn noise(mut self, noise: &'static Noise) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Run to completion. A non-zero exit status is an error.
    pub fn run(self) -> Result<Output> {
        if self.program.is_empty() {
            bail!("no program configured");
        }
        let name = self.program.to_string_lossy().into_owned();
        let noise = self.noise.unwrap_or(&Noise::NONE);

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("cannot run `{name}`"))?;

        if !output.status.success() {
            bail!(failure_message(&name, &output));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let kept = noise.keep(&stderr);
        if !kept.is_empty() {
            log!(&name; "{}", kept.join("\n"));
        }
        Ok(output)
    }

    /// Run with all three streams on the null device and wait for the
    /// program itself only. A non-zero exit status is an error.
    pub fn spawn_detached(self) -> Result<()> {
        if self.program.is_empty() {
            bail!("no program configured");
        }
        let name = self.program.to_string_lossy().into_owned();

        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("cannot run `{name}`"))?;

        if !status.success() {
            bail!("`{name}` exited with {status}");
        }
        Ok(())
    }
}

/// Line prefixes a helper prints that are not worth showing.
#[derive(Debug)]
pub struct Noise {
    prefixes: &'static [&'static str],
}

impl Noise {
    /// Show every line.
    pub const NONE: Self = Self::prefixes(&[]);

    pub const fn prefixes(prefixes: &'static [&'static str]) -> Self {
        Self { prefixes }
    }

    fn is_noise(&self, line: &str) -> bool {
        line.is_empty() || self.prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Trimmed, colour-free lines of `text` that are not noise.
    fn keep<'a>(&self, text: &'a str) -> Vec<Cow<'a, str>> {
        text.lines()
            .map(|line| match strip_ansi(line) {
                Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
            })
            .filter(|line| !self.is_noise(line))
            .collect()
    }
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static ANSI: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").ok());
    match ANSI.as_ref() {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}

/// Everything the helper printed, unfiltered.
fn failure_message(name: &str, output: &Output) -> String {
    let mut message = format!("`{name}` exited with {}", output.status);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = Noise::NONE.keep(&stderr);
    if !detail.is_empty() {
        message.push('\n');
        message.push_str(&detail.join("\n"));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        message.push_str("\nstdout:\n");
        message.push_str(stdout.trim());
    }
    message
}
