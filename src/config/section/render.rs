//! `[render]` section configuration.
//!
//! ```toml
//! [render]
//! plantuml = ["plantuml"]                       # Installed wrapper script
//! # plantuml = ["java", "-jar", "plantuml.jar"] # Or the jar directly
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::log;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Diagram renderer command (program followed by fixed arguments).
    pub plantuml: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            plantuml: vec!["plantuml".into()],
        }
    }
}

impl RenderConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let Some(program) = self.plantuml.first() else {
            return Err(ConfigError::Validation(
                "render.plantuml must name a command".into(),
            ));
        };

        // Diagram builds fail one by one later; pages still render.
        if which::which(program).is_err() {
            log!("warning"; "diagram renderer `{}` not found in PATH", program);
        }
        Ok(())
    }
}
