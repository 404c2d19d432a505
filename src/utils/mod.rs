//! Utility modules shared by the preview pipeline.

pub mod exec;
pub mod mime;
pub mod path;
