//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "src"              # Page directories (relative to config file)
//! output = "target/preview"   # Rendered pages (relative to config file)
//! content_ext = "md"          # Page content suffix, one per directory
//! diagram_ext = "puml"        # Diagram source suffix
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source tree root.
    pub source: PathBuf,

    /// Preview output root.
    pub output: PathBuf,

    /// Suffix of page content files (without dot).
    pub content_ext: String,

    /// Suffix of diagram source files (without dot).
    pub diagram_ext: String,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: "src".into(),
            output: "target/preview".into(),
            content_ext: "md".into(),
            diagram_ext: "puml".into(),
        }
    }
}

impl BuildSectionConfig {
    /// Check whether `path` is a page content file.
    pub fn is_content(&self, path: &Path) -> bool {
        has_extension(path, &self.content_ext)
    }

    /// Check whether `path` is a diagram source file.
    pub fn is_diagram(&self, path: &Path) -> bool {
        has_extension(path, &self.diagram_ext)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.is_dir() {
            return Err(ConfigError::Validation(format!(
                "no source directory {}",
                self.source.display()
            )));
        }

        let content = self.content_ext.trim_start_matches('.');
        let diagram = self.diagram_ext.trim_start_matches('.');
        if content.is_empty() || diagram.is_empty() {
            return Err(ConfigError::Validation(
                "build.content_ext and build.diagram_ext must not be empty".into(),
            ));
        }
        if content == diagram {
            return Err(ConfigError::Validation(format!(
                "build.content_ext and build.diagram_ext are both `{content}`"
            )));
        }
        Ok(())
    }

    /// Strip a leading dot users tend to write (`".md"` -> `"md"`).
    pub(crate) fn normalize_extensions(&mut self) {
        self.content_ext = self.content_ext.trim_start_matches('.').to_string();
        self.diagram_ext = self.diagram_ext.trim_start_matches('.').to_string();
    }
}

/// Exact, case-sensitive match: `INTRO.MD` is not a `md` file.
fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}
