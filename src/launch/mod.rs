//! Preview launcher and live-reload server.
//!
//! The first [`Launcher::launch`] starts both servers:
//!
//! ```text
//! http://localhost:<port>/...      static files from the output root
//! ws://localhost:<reload_port>     live-reload channel
//! ```
//!
//! Every rendered page ends with [`LIVE_RELOAD_SNIPPET`], which loads the
//! client script from the static server; the script then connects to the
//! live-reload channel and reloads when its page (or an image on it) is
//! rebuilt.

mod livereload;
mod server;
mod viewer;


pub use livereload::{ReloadHub, ReloadMessage};
pub use server::StaticServer;
pub use viewer::{SystemViewer, Viewer};

use std::{
    io,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::config::PreviewConfig;
use crate::utils::path::url_for_relative;
use crate::{debug, log};

/// URL path the static server answers with the live-reload client script.
pub const LIVE_RELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Appended to every rendered page.
pub const LIVE_RELOAD_SNIPPET: &str = "\n<script src=\"/__livereload.js\"></script>\n";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("cannot start {service} on port {port}")]
    Bind {
        service: &'static str,
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{} is not under the served directory {}", path.display(), root.display())]
    NotServed { path: PathBuf, root: PathBuf },

    #[error(transparent)]
    Io(#[from] io::Error),
}

struct Servers {
    http: StaticServer,
    reload: ReloadHub,
}

#[derive(Default)]
struct LaunchState {
    /// Pages already shown in a viewer.
    launched: FxHashSet<PathBuf>,
    servers: Option<Servers>,
}

/// Serves the output tree and opens pages in a viewer, each at most once.
pub struct Launcher {
    output_root: PathBuf,
    port: u16,
    reload_port: u16,
    open: bool,
    viewer: Box<dyn Viewer>,
    state: Mutex<LaunchState>,
}

impl Launcher {
    pub fn new(config: &PreviewConfig, viewer: Box<dyn Viewer>) -> Self {
        Self {
            output_root: config.build.output.clone(),
            port: config.serve.port,
            reload_port: config.serve.reload_port,
            open: config.serve.open,
            viewer,
            state: Mutex::new(LaunchState::default()),
        }
    }

    /// Make sure `page` is being previewed.
    ///
    /// Starts the servers on first use. A page is handed to the viewer only
    /// the first time; a viewer failure is logged and the page stays
    /// unlaunched, so a later call retries.
    pub fn launch(&self, page: &Path) -> Result<(), LaunchError> {
        let url_path = url_for_relative(&self.output_root, page).ok_or_else(|| {
            LaunchError::NotServed {
                path: page.to_path_buf(),
                root: self.output_root.clone(),
            }
        })?;

        let mut state = self.state.lock();
        let port = match &state.servers {
            Some(servers) => servers.http.port(),
            None => {
                let servers = self.start_servers()?;
                let port = servers.http.port();
                state.servers = Some(servers);
                port
            }
        };

        if !self.open || state.launched.contains(page) {
            return Ok(());
        }

        let url = format!("http://localhost:{port}{url_path}");
        match self.viewer.open(&url) {
            Ok(()) => {
                debug!("launch"; "opened {}", url);
                state.launched.insert(page.to_path_buf());
            }
            Err(e) => log!("launch"; "cannot open {}: {:#}", url, e),
        }
        Ok(())
    }

    /// Tell live-reload clients that `paths` were rebuilt.
    ///
    /// Does nothing before the servers are started.
    pub fn notify(&self, paths: &[PathBuf]) {
        let state = self.state.lock();
        let Some(servers) = &state.servers else {
            return;
        };

        for path in paths {
            let Some(url) = url_for_relative(&self.output_root, path) else {
                debug!("reload"; "{} is not served", path.display());
                continue;
            };
            let reached = servers.reload.broadcast(&ReloadMessage::reload(url.as_str()));
            debug!("reload"; "{} -> {} client(s)", url, reached);
        }
    }

    /// Actual `(http, live-reload)` ports once the servers run.
    #[cfg(test)]
    pub fn ports(&self) -> Option<(u16, u16)> {
        let state = self.state.lock();
        state
            .servers
            .as_ref()
            .map(|s| (s.http.port(), s.reload.port()))
    }

    #[cfg(test)]
    pub fn is_launched(&self, page: &Path) -> bool {
        self.state.lock().launched.contains(page)
    }

    /// Stop both servers. A later `launch` starts them again.
    pub fn shutdown(&self) {
        let servers = self.state.lock().servers.take();
        if let Some(Servers { http, reload }) = servers {
            http.stop();
            reload.stop();
            debug!("launch"; "servers stopped");
        }
    }

    fn start_servers(&self) -> Result<Servers, LaunchError> {
        let reload = ReloadHub::start(self.reload_port)?;
        let http = match StaticServer::start(&self.output_root, self.port, reload.port()) {
            Ok(http) => http,
            Err(e) => {
                reload.stop();
                return Err(e);
            }
        };

        log!("serve"; "http://localhost:{}", http.port());
        Ok(Servers { http, reload })
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
