//! Renderer adapters.
//!
//! Narrow interfaces around the two external renderers, so the builder and
//! its tests never depend on a concrete implementation.
//!
//! | Adapter               | Input                  | Output                    |
//! |-----------------------|------------------------|---------------------------|
//! | [`MarkdownRenderer`]  | page content bytes     | HTML fragment bytes       |
//! | [`PlantUmlRenderer`]  | diagram source path    | PNG files in output dir   |

mod markdown;
mod plantuml;

pub use markdown::{MarkdownRenderer, image_links};
pub use plantuml::PlantUmlRenderer;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Converts page content into HTML markup.
pub trait MarkupRenderer: Send + Sync {
    fn render_markup(&self, source: &[u8]) -> Result<Vec<u8>>;
}

/// Converts a diagram source file into images.
pub trait DiagramRenderer: Send + Sync {
    /// Render `source` into `output_dir`, returning the image paths written.
    fn render_diagram(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>>;
}
