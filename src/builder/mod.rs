//! Artifact builder.
//!
//! Maps one changed source file to its output artifact(s):
//!
//! ```text
//! <src>/Getting Started/intro.md    → <out>/GettingStarted/intro.html  (+ live-reload snippet)
//! <src>/Getting Started/flow.puml   → <out>/GettingStarted/flow.png    (PlantUML names the files)
//! <src>/Getting Started/notes.txt   → skipped
//! ```
//!
//! [`Builder::build_all`] additionally enforces the tree layout: every
//! directory below the source root holds exactly one page content file.

mod output;
mod walk;


pub use walk::{DirFiles, all_dirs, classify_dir, files_in, page_dirs};

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::config::{BuildSectionConfig, PreviewConfig};
use crate::render::{DiagramRenderer, MarkupRenderer};
use crate::{debug, log};

// ============================================================================
// Types
// ============================================================================

/// Build failures.
///
/// `NoContent` and `MultipleContent` are structural: the source tree itself
/// is malformed and a full build cannot proceed. The rest concern a single
/// file.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no page content in {}", .0.display())]
    NoContent(PathBuf),

    #[error("more than one content file in {}", .0.display())]
    MultipleContent(PathBuf),

    #[error("cannot access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render {}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BuildError {
    #[cfg(test)]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::NoContent(_) | Self::MultipleContent(_))
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a single build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Rendered page HTML.
    Page(PathBuf),
    /// Images rendered from one diagram source.
    Diagrams(Vec<PathBuf>),
    /// Not a page or diagram source.
    Skipped,
}

impl Artifact {
    /// Output files written by the build.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Page(path) => std::slice::from_ref(path),
            Self::Diagrams(paths) => paths,
            Self::Skipped => &[],
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct Builder {
    build: BuildSectionConfig,
    markup: Box<dyn MarkupRenderer>,
    diagrams: Box<dyn DiagramRenderer>,
}

impl Builder {
    pub fn new(
        config: &PreviewConfig,
        markup: Box<dyn MarkupRenderer>,
        diagrams: Box<dyn DiagramRenderer>,
    ) -> Self {
        Self {
            build: config.build.clone(),
            markup,
            diagrams,
        }
    }

    pub fn config(&self) -> &BuildSectionConfig {
        &self.build
    }

    pub fn source_root(&self) -> &Path {
        &self.build.source
    }

    pub fn markup(&self) -> &dyn MarkupRenderer {
        self.markup.as_ref()
    }

    /// Output directory for a source file, `None` outside the source tree.
    pub fn output_dir_for(&self, source: &Path) -> Option<PathBuf> {
        output::output_dir_for(&self.build.source, &self.build.output, source)
    }

    /// Build the artifact(s) for one changed source file.
    pub fn build(&self, source: &Path) -> Result<Artifact, BuildError> {
        let is_content = self.build.is_content(source);
        if !is_content && !self.build.is_diagram(source) {
            return Ok(Artifact::Skipped);
        }

        let Some(out_dir) = self.output_dir_for(source) else {
            debug!("build"; "{} is outside the source tree", source.display());
            return Ok(Artifact::Skipped);
        };

        if is_content {
            self.build_page(source, &out_dir).map(Artifact::Page)
        } else {
            self.build_diagrams(source, &out_dir).map(Artifact::Diagrams)
        }
    }

    /// Build every page directory below the source root.
    ///
    /// Returns the rendered page paths in walk order. A structural error
    /// stops the walk; directories before it stay built. Failures of a
    /// single file are logged and the walk continues.
    pub fn build_all(&self) -> Result<Vec<PathBuf>, BuildError> {
        let root = &self.build.source;
        let dirs = page_dirs(root).map_err(|e| BuildError::io(root, e))?;

        let mut pages = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let files = classify_dir(&dir, &self.build).map_err(|e| BuildError::io(&dir, e))?;
            let content = files.single_content(&dir)?;

            match self.build(content) {
                Ok(artifact) => pages.extend(artifact.paths().iter().cloned()),
                Err(e) => report(&e),
            }
            for diagram in &files.diagrams {
                if let Err(e) = self.build(diagram) {
                    report(&e);
                }
            }
        }

        Ok(pages)
    }

    fn build_page(&self, source: &Path, out_dir: &Path) -> Result<PathBuf, BuildError> {
        let bytes = fs::read(source).map_err(|e| BuildError::io(source, e))?;
        let html = self
            .markup
            .render_markup(&bytes)
            .map_err(|source_err| BuildError::Render {
                path: source.to_path_buf(),
                source: source_err.into(),
            })?;

        fs::create_dir_all(out_dir).map_err(|e| BuildError::io(out_dir, e))?;
        let Some(page) = output::page_path(out_dir, source) else {
            return Err(BuildError::io(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
            ));
        };
        output::write_page(&page, &html).map_err(|e| BuildError::io(&page, e))?;

        debug!("build"; "{} -> {}", source.display(), page.display());
        Ok(page)
    }

    fn build_diagrams(&self, source: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        fs::create_dir_all(out_dir).map_err(|e| BuildError::io(out_dir, e))?;
        let images = self
            .diagrams
            .render_diagram(source, out_dir)
            .map_err(|source_err| BuildError::Render {
                path: source.to_path_buf(),
                source: source_err.into(),
            })?;

        debug!("build"; "{} -> {} image(s)", source.display(), images.len());
        Ok(images)
    }
}

impl DirFiles {
    /// The one content file of a page directory.
    pub fn single_content(&self, dir: &Path) -> Result<&Path, BuildError> {
        match self.content.as_slice() {
            [] => Err(BuildError::NoContent(dir.to_path_buf())),
            [single] => Ok(single.as_path()),
            _ => Err(BuildError::MultipleContent(dir.to_path_buf())),
        }
    }
}

/// Log a single-file failure with its full cause chain.
fn report(err: &BuildError) {
    log!("error"; "{}", chain(err));
}

/// `error: cause: cause` on one line.
pub fn chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
