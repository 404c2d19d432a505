//! `[serve]` section configuration.
//!
//! Contains preview server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! port = 27249                # Static HTTP server port
//! reload_port = 35729         # Live-reload WebSocket port
//! open = true                 # Open rebuilt pages in the system viewer
//! ```
//!
//! Both servers bind `127.0.0.1` only. Ports are fixed: a port already in
//! use is an error, never silently replaced by another one.

use serde::{Deserialize, Serialize};

use crate::cli::PreviewArgs;
use crate::config::ConfigError;

/// Default static server port.
pub const DEFAULT_PORT: u16 = 27249;

/// Default live-reload port.
pub const DEFAULT_RELOAD_PORT: u16 = 35729;

/// Preview server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// HTTP port number.
    pub port: u16,

    /// Live-reload WebSocket port number.
    pub reload_port: u16,

    /// Open pages in a viewer the first time they are built.
    pub open: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reload_port: DEFAULT_RELOAD_PORT,
            open: true,
        }
    }
}

impl ServeConfig {
    /// Command-line flags win over the file.
    pub(crate) fn apply(&mut self, args: &PreviewArgs) {
        self.port = args.port.unwrap_or(self.port);
        self.reload_port = args.reload_port.unwrap_or(self.reload_port);
        self.open &= !args.no_open;
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.port == self.reload_port {
            return Err(ConfigError::Validation(format!(
                "serve.port and serve.reload_port are both {}",
                self.port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config("[serve]\nport = 8080\nreload_port = 8081\nopen = false");

        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.reload_port, 8081);
        assert!(!config.serve.open);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.serve.port, 27249);
        assert_eq!(config.serve.reload_port, 35729);
        assert!(config.serve.open);
    }

    #[test]
    fn test_serve_config_port_range() {
        let config = test_parse_config("[serve]\nport = 1");
        assert_eq!(config.serve.port, 1);

        let config = test_parse_config("[serve]\nport = 65535");
        assert_eq!(config.serve.port, 65535);
    }

    #[test]
    fn test_serve_config_same_ports_rejected() {
        let config = test_parse_config("[serve]\nport = 9000\nreload_port = 9000");
        let err = config.serve.validate().unwrap_err();
        assert!(err.to_string().contains("both 9000"));
    }
}
