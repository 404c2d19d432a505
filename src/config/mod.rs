//! Preview configuration management for `mdpages.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── render     # [render]
//! │   ├── serve      # [serve]
//! │   └── watch      # [watch]
//! ├── error.rs       # ConfigError
//! ├── util.rs        # Config file lookup, path resolution
//! └── mod.rs         # PreviewConfig (this file)
//! ```
//!
//! The config file is optional: without one, every section uses its
//! defaults and paths resolve against the current directory.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{BuildSectionConfig, RenderConfig, ServeConfig, WatchConfig};

use util::{find_config_file, resolve_path};

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "mdpages.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing mdpages.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Absolute path to the config file, empty when none was found (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Source and output settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Watcher and debounce settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Renderer settings
    #[serde(default)]
    pub render: RenderConfig,
}

impl PreviewConfig {
    /// Load `cli.config`, searched upward from the current directory, then
    /// apply the command line on top and validate.
    ///
    /// Relative paths resolve against the config file's directory, or the
    /// current directory when no config file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => Self::read(&path)?,
            None if cli.config != Path::new(CONFIG_FILE) => {
                bail!(ConfigError::Validation(format!(
                    "config file `{}` not found",
                    cli.config.display()
                )));
            }
            None => Self::default(),
        };
        if config.root.as_os_str().is_empty() {
            config.root = cwd;
        }

        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse the file at `path`. Unknown keys are reported, not rejected.
    fn read(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let (mut config, unknown) = Self::parse(&text)?;

        if !unknown.is_empty() {
            log!("warning"; "ignoring unknown keys in {}: {}", path.display(), unknown.join(", "));
        }

        config.config_path = path.to_path_buf();
        config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// The config and the dotted paths of every key serde did not use.
    fn parse(text: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut unknown = Vec::new();
        let config = serde_ignored::deserialize(toml::Deserializer::new(text), |key| {
            unknown.push(key.to_string());
        })?;
        Ok((config, unknown))
    }

    fn finalize(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        if let Some(source) = &cli.source {
            self.build.source.clone_from(source);
        }
        if let Some(output) = &cli.output {
            self.build.output.clone_from(output);
        }
        if let Commands::Preview { args } = &cli.command {
            self.serve.apply(args);
        }

        self.root = normalize_path(&self.root);
        if !self.config_path.as_os_str().is_empty() {
            self.config_path = normalize_path(&self.config_path);
        }
        self.build.source = resolve_path(&self.build.source, &self.root);
        self.build.output = resolve_path(&self.build.output, &self.root);
        self.build.normalize_extensions();
    }

    /// Check every section, stopping at the first problem.
    pub fn validate(&self) -> Result<()> {
        self.build.validate()?;
        self.serve.validate()?;
        self.render.validate()?;

        if self.build.output.starts_with(&self.build.source) {
            bail!(ConfigError::Validation(format!(
                "output directory {} is inside the source directory",
                self.build.output.display()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PreviewConfig {
    let (parsed, ignored) = PreviewConfig::parse(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Config rooted at `root` with `src/` and `out/` below it, defaults elsewhere.
#[cfg(test)]
pub fn test_config(root: &Path) -> PreviewConfig {
    let mut config = PreviewConfig {
        root: root.to_path_buf(),
        ..Default::default()
    };
    config.build.source = root.join("src");
    config.build.output = root.join("out");
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_toml() {
        let err = PreviewConfig::parse("[build\nsource = \"src\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_preview_config_default() {
        let config = PreviewConfig::default();

        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.build.content_ext, "md");
        assert_eq!(config.serve.port, 27249);
        assert_eq!(config.watch.debounce_ms, 500);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\nsource = \"docs\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = PreviewConfig::parse(content).unwrap();

        assert_eq!(config.build.source, PathBuf::from("docs"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[build]\nsource = \"docs\"\n[serve]\nport = 9000";
        let (_, ignored) = PreviewConfig::parse(content).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_finalize_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();

        let cli = Cli::parse_from(["mdpages", "build"]);
        let mut config = test_parse_config("[build]\nsource = \"docs\"\ncontent_ext = \".md\"");
        config.root = dir.path().to_path_buf();
        config.finalize(&cli);

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.build.source, root.join("docs"));
        assert_eq!(config.build.output, root.join("target/preview"));
        assert_eq!(config.build.content_ext, "md");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pages")).unwrap();

        let cli = Cli::parse_from([
            "mdpages", "-s", "pages", "-o", "site", "preview", "--port", "8000",
            "--reload-port", "8001", "--no-open",
        ]);
        let mut config = PreviewConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.finalize(&cli);

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.build.source, root.join("pages"));
        assert_eq!(config.build.output, root.join("site"));
        assert_eq!(config.serve.port, 8000);
        assert_eq!(config.serve.reload_port, 8001);
        assert!(!config.serve.open);
    }

    #[test]
    fn test_output_inside_source_rejected() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();

        let mut config = test_config(dir.path());
        config.build.output = dir.path().join("src/out");
        assert!(config.validate().is_err());
    }
}
