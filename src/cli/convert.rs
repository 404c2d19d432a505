//! `convert` command: full-tree conversion plus manifest, optionally
//! published into a directory.

use std::path::Path;

use anyhow::Result;

use super::common::new_builder;
use crate::config::PreviewConfig;
use crate::deploy::{DirPublisher, MANIFEST_FILE, convert_tree, sync, write_manifest};
use crate::log;

pub fn convert(config: &PreviewConfig, manifest: Option<&Path>, publish: Option<&Path>) -> Result<()> {
    let records = convert_tree(&new_builder(config))?;

    let default_path = config.build.output.join(MANIFEST_FILE);
    let path = manifest.unwrap_or(&default_path);
    write_manifest(&records, path)?;
    log!("convert"; "{} page(s) -> {}", records.len(), path.display());

    if let Some(dir) = publish {
        let report = sync(&records, &mut DirPublisher::new(dir))?;
        log!(
            "sync";
            "{} published, {} unchanged in {}",
            report.published.len(),
            report.unchanged.len(),
            dir.display()
        );
    }
    Ok(())
}
