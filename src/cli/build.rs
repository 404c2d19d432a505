//! `build` command: render the whole tree once.

use anyhow::Result;

use super::common::new_builder;
use crate::config::PreviewConfig;
use crate::log;

pub fn build_tree(config: &PreviewConfig) -> Result<()> {
    let pages = new_builder(config).build_all()?;
    log!("build"; "{} page(s) in {}", pages.len(), config.build.output.display());
    Ok(())
}
