//! Diagram rendering via an external PlantUML process.
//!
//! Runs `<command> -tpng -o <output_dir> <source>`. PlantUML names its
//! images itself (file stem, `@startuml name`, numbered pages), so the
//! produced files are found by comparing the output directory before and
//! after the run.

use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use super::DiagramRenderer;
use crate::utils::exec::{Cmd, Noise};

/// PlantUML chatter that is not worth logging.
static PLANTUML_NOISE: Noise = Noise::prefixes(&["Picked up JAVA_TOOL_OPTIONS", "WARNING:"]);

#[derive(Debug, Clone)]
pub struct PlantUmlRenderer {
    command: Vec<String>,
}

impl PlantUmlRenderer {
    /// `command` is the program followed by fixed arguments.
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl DiagramRenderer for PlantUmlRenderer {
    fn render_diagram(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("cannot create {}", output_dir.display()))?;
        let before = snapshot(output_dir)?;

        Cmd::from_slice(&self.command)
            .args(["-tpng", "-o"])
            .arg(output_dir)
            .arg(source)
            .noise(&PLANTUML_NOISE)
            .run()?;

        let mut produced: Vec<PathBuf> = snapshot(output_dir)?
            .into_iter()
            .filter(|(path, stamp)| before.get(path) != Some(stamp))
            .map(|(path, _)| path)
            .collect();

        // Rewritten within the filesystem's timestamp granularity
        if produced.is_empty()
            && let Some(stem) = source.file_stem()
        {
            let expected = output_dir.join(format!("{}.png", stem.to_string_lossy()));
            if expected.is_file() {
                produced.push(expected);
            }
        }

        if produced.is_empty() {
            bail!("diagram renderer produced no image for {}", source.display());
        }
        produced.sort();
        Ok(produced)
    }
}

/// Modification time and size of every PNG directly inside `dir`.
fn snapshot(dir: &Path) -> Result<FxHashMap<PathBuf, (SystemTime, u64)>> {
    let mut map = FxHashMap::default();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let is_png = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        let meta = entry.metadata()?;
        if meta.is_file() {
            map.insert(path, (meta.modified()?, meta.len()));
        }
    }
    Ok(map)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Shell stand-in: `$3` is the output dir, `$4` the source file.
    fn fake_plantuml(script: &str) -> PlantUmlRenderer {
        PlantUmlRenderer::new(vec![
            "sh".into(),
            "-c".into(),
            script.into(),
            "plantuml".into(),
        ])
    }

    #[test]
    fn test_reports_new_image() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("diagram.puml");
        fs::write(&source, "@startuml\nA -> B\n@enduml\n").unwrap();
        let out = dir.path().join("out");

        let renderer = fake_plantuml(r#"printf png > "$3/$(basename "$4" .puml).png""#);
        let produced = renderer.render_diagram(&source, &out).unwrap();
        assert_eq!(produced, vec![out.join("diagram.png")]);
    }

    #[test]
    fn test_reports_multiple_pages() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("flow.puml");
        fs::write(&source, "").unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("unrelated.png"), "old").unwrap();

        let renderer = fake_plantuml(r#"printf 1 > "$3/flow.png"; printf 2 > "$3/flow_001.png""#);
        let produced = renderer.render_diagram(&source, &out).unwrap();
        assert_eq!(produced, vec![out.join("flow.png"), out.join("flow_001.png")]);
    }

    #[test]
    fn test_rerender_same_content_found() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("diagram.puml");
        fs::write(&source, "").unwrap();
        let out = dir.path().join("out");

        let renderer = fake_plantuml(r#"printf png > "$3/diagram.png""#);
        renderer.render_diagram(&source, &out).unwrap();
        let produced = renderer.render_diagram(&source, &out).unwrap();
        assert_eq!(produced, vec![out.join("diagram.png")]);
    }

    #[test]
    fn test_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.puml");
        fs::write(&source, "").unwrap();

        let renderer = fake_plantuml("echo 'Syntax Error?' >&2; exit 1");
        let err = renderer
            .render_diagram(&source, &dir.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("Syntax Error?"));
    }

    #[test]
    fn test_no_output_is_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("empty.puml");
        fs::write(&source, "").unwrap();

        let renderer = fake_plantuml("true");
        assert!(
            renderer
                .render_diagram(&source, &dir.path().join("out"))
                .is_err()
        );
    }
}
