//! Helpers shared across CLI commands.

use std::path::Path;

use crate::builder::Builder;
use crate::config::PreviewConfig;
use crate::render::{MarkdownRenderer, PlantUmlRenderer};

/// Builder wired to the configured renderers.
pub fn new_builder(config: &PreviewConfig) -> Builder {
    Builder::new(
        config,
        Box::new(MarkdownRenderer),
        Box::new(PlantUmlRenderer::new(config.render.plantuml.clone())),
    )
}

/// `path` relative to `root` for log lines, unchanged when outside it.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
