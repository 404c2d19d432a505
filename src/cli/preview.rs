//! `preview` command: build, open, then rebuild on change.
//!
//! ```text
//! build_all ──► launch every page
//!     │
//! watcher thread ──submit──► Coordinator ──► rebuild thread ──► Builder
//!                                                    └──► Launcher (open new pages, notify)
//! ```
//!
//! Runs until Ctrl+C, until the watcher fails, or until the preview
//! servers cannot be started for a page that first appears in watch mode.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::common::{display_relative, new_builder};
use crate::builder::{Artifact, Builder, chain};
use crate::config::PreviewConfig;
use crate::coordinator::{Coordinator, Fatal, JobRunner};
use crate::core::{ShutdownSignal, Supervisor, register_shutdown};
use crate::launch::{LaunchError, Launcher, SystemViewer};
use crate::logger::{status_error, status_success};
use crate::watch::DirWatcher;
use crate::{debug, log};

pub fn preview(config: &PreviewConfig) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    register_shutdown(&shutdown);

    // Watch before the initial build so edits made meanwhile are not lost
    let (coordinator, worker) = Coordinator::new(config.watch.debounce());
    let watcher = DirWatcher::new(&config.build.source, coordinator)?;

    let builder = new_builder(config);
    let pages = builder.build_all()?;
    log!("build"; "{} page(s) in {}", pages.len(), config.build.output.display());

    let launcher = Arc::new(Launcher::new(config, Box::new(SystemViewer::default())));
    for page in &pages {
        launcher.launch(page)?;
    }

    let mut supervisor = Supervisor::new(shutdown);
    supervisor.spawn("watcher", move |signal| watcher.run(&signal))?;

    let mut rebuild = Rebuild {
        builder,
        launcher: Arc::clone(&launcher),
    };
    supervisor.spawn("rebuild", move |signal| worker.run(&mut rebuild, &signal))?;

    let result = supervisor.wait();
    launcher.shutdown();

    if let Err(e) = &result {
        log!("watch"; "watch mode stopped: {:#}", e);
    }
    result
}

/// Rebuilds one changed file and refreshes whatever shows it.
struct Rebuild {
    builder: Builder,
    launcher: Arc<Launcher>,
}

impl JobRunner for Rebuild {
    fn run(&mut self, path: &Path) -> Result<()> {
        let name = display_relative(self.builder.source_root(), path);

        let artifact = match self.builder.build(path) {
            Ok(Artifact::Skipped) => {
                debug!("watch"; "ignored {}", name);
                return Ok(());
            }
            Ok(artifact) => artifact,
            Err(e) => {
                status_error(&format!("failed to build {name}"), &chain(&e));
                return Ok(());
            }
        };

        if let Artifact::Page(page) = &artifact {
            match self.launcher.launch(page) {
                Ok(()) => {}
                Err(e @ LaunchError::Bind { .. }) => return Err(Fatal(e.into()).into()),
                Err(e) => return Err(e.into()),
            }
        }
        self.launcher.notify(artifact.paths());
        status_success(&format!("rebuilt {name}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use anyhow::bail;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tungstenite::Message;

    use super::*;
    use crate::config::test_config;
    use crate::launch::{ReloadMessage, Viewer};
    use crate::render::{DiagramRenderer, MarkdownRenderer};

    /// Writes `<stem>.png`; fails for sources named `broken.puml`.
    struct FakeDiagrams;

    impl DiagramRenderer for FakeDiagrams {
        fn render_diagram(&self, source: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
            if source.ends_with("broken.puml") {
                bail!("syntax error");
            }
            let stem = source.file_stem().unwrap().to_string_lossy();
            let image = output_dir.join(format!("{stem}.png"));
            fs::write(&image, "png")?;
            Ok(vec![image])
        }
    }

    #[derive(Clone, Default)]
    struct Opened(Arc<Mutex<Vec<String>>>);

    impl Viewer for Opened {
        fn open(&self, url: &str) -> Result<()> {
            self.0.lock().push(url.to_string());
            Ok(())
        }
    }

    struct Fixture {
        _temp: TempDir,
        config: PreviewConfig,
        opened: Opened,
        rebuild: Rebuild,
    }

    impl Fixture {
        fn new(port: u16) -> Self {
            let temp = TempDir::new().unwrap();
            let mut config = test_config(temp.path());
            config.serve.port = port;
            config.serve.reload_port = 0;
            fs::create_dir_all(&config.build.source).unwrap();

            let opened = Opened::default();
            let builder = Builder::new(&config, Box::new(MarkdownRenderer), Box::new(FakeDiagrams));
            let launcher = Launcher::new(&config, Box::new(opened.clone()));
            let rebuild = Rebuild {
                builder,
                launcher: Arc::new(launcher),
            };

            Self {
                _temp: temp,
                config,
                opened,
                rebuild,
            }
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.config.build.source.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_new_page_opened_once() {
        let mut fixture = Fixture::new(0);
        let page = fixture.write("New Section/page.md", "# New");

        fixture.rebuild.run(&page).unwrap();
        fixture.rebuild.run(&page).unwrap();

        let (port, _) = fixture.rebuild.launcher.ports().unwrap();
        assert_eq!(
            *fixture.opened.0.lock(),
            vec![format!("http://localhost:{port}/NewSection/page.html")]
        );
    }

    #[test]
    fn test_diagram_rebuild_reloads_image() {
        let mut fixture = Fixture::new(0);
        let page = fixture.write("intro/intro.md", "![flow](flow.png)");
        let diagram = fixture.write("intro/flow.puml", "@startuml\nA -> B\n@enduml");
        fixture.rebuild.run(&page).unwrap();

        let (_, reload_port) = fixture.rebuild.launcher.ports().unwrap();
        let (mut ws, _) = tungstenite::connect(format!("ws://127.0.0.1:{reload_port}")).unwrap();
        if let tungstenite::stream::MaybeTlsStream::Plain(stream) = ws.get_mut() {
            stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        }

        let expected = ReloadMessage::reload("/intro/flow.png");
        let mut heard = false;
        let deadline = Instant::now() + Duration::from_secs(10);
        while !heard && Instant::now() < deadline {
            // Rebuild until the client is registered and hears about it
            fixture.rebuild.run(&diagram).unwrap();
            while let Ok(Message::Text(text)) = ws.read() {
                if serde_json::from_str::<ReloadMessage>(text.as_str()).unwrap() == expected {
                    heard = true;
                    break;
                }
            }
        }

        assert!(heard);
        assert!(fixture.config.build.output.join("intro/flow.png").is_file());
    }

    #[test]
    fn test_render_failure_keeps_worker_running() {
        let mut fixture = Fixture::new(0);
        let broken = fixture.write("intro/broken.puml", "@startuml");

        assert!(fixture.rebuild.run(&broken).is_ok());
        assert!(fixture.rebuild.launcher.ports().is_none());
    }

    #[test]
    fn test_skipped_file_ignored() {
        let mut fixture = Fixture::new(0);
        let notes = fixture.write("intro/notes.txt", "todo");

        assert!(fixture.rebuild.run(&notes).is_ok());
        assert!(fixture.opened.0.lock().is_empty());
    }

    #[test]
    fn test_bind_failure_is_fatal() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut fixture = Fixture::new(taken.local_addr().unwrap().port());
        let page = fixture.write("intro/intro.md", "# Intro");

        let err = fixture.rebuild.run(&page).unwrap_err();
        assert!(err.is::<Fatal>());
        assert!(err.to_string().starts_with("cannot start preview server"));
        assert!(fixture.opened.0.lock().is_empty());
    }
}
