//! Command-line interface module.

mod args;
pub mod build;
pub mod common;
pub mod convert;
pub mod preview;

pub use args::{Cli, Commands, PreviewArgs};
