use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::Mutex;
use tempfile::TempDir;

use super::DirWatcher;
use crate::coordinator::{Coordinator, JobRunner};
use crate::core::ShutdownSignal;
use crate::utils::path::normalize_path;

#[derive(Clone, Default)]
struct Recorder {
    built: Arc<Mutex<Vec<PathBuf>>>,
}

impl JobRunner for Recorder {
    fn run(&mut self, path: &Path) -> Result<()> {
        self.built.lock().push(path.to_path_buf());
        Ok(())
    }
}

struct Pipeline {
    temp: TempDir,
    root: PathBuf,
    recorder: Recorder,
    shutdown: ShutdownSignal,
    handles: Vec<JoinHandle<Result<()>>>,
}

impl Pipeline {
    /// Watcher + worker over a fresh source tree containing `dirs`.
    fn start(dirs: &[&str], debounce: Duration) -> Self {
        let temp = TempDir::new().unwrap();
        let root = normalize_path(temp.path()).join("src");
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::create_dir_all(&root).unwrap();

        let (coordinator, worker) = Coordinator::new(debounce);
        let watcher = DirWatcher::new(&root, coordinator).unwrap();
        let recorder = Recorder::default();
        let shutdown = ShutdownSignal::new();

        let watch_shutdown = shutdown.clone();
        let work_shutdown = shutdown.clone();
        let mut runner = recorder.clone();
        let handles = vec![
            thread::spawn(move || watcher.run(&watch_shutdown)),
            thread::spawn(move || worker.run(&mut runner, &work_shutdown)),
        ];

        Self {
            temp,
            root,
            recorder,
            shutdown,
            handles,
        }
    }

    fn wait_for(&self, path: &Path) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if self.recorder.built.lock().iter().any(|p| p == path) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn builds_of(&self, path: &Path) -> usize {
        self.recorder.built.lock().iter().filter(|p| *p == path).count()
    }

    fn stop(self) {
        self.shutdown.trigger();
        for handle in self.handles {
            handle.join().unwrap().unwrap();
        }
    }
}

#[test]
fn test_existing_directory_change_forwarded() {
    let pipeline = Pipeline::start(&["intro"], Duration::from_millis(500));
    let page = pipeline.root.join("intro/intro.md");

    fs::write(&page, "# Intro").unwrap();
    assert!(pipeline.wait_for(&page));
    pipeline.stop();
}

#[test]
fn test_new_directory_watched_and_built_once() {
    let pipeline = Pipeline::start(&[], Duration::from_secs(1));
    let dir = pipeline.root.join("new");
    let page = dir.join("page.md");

    fs::create_dir(&dir).unwrap();
    thread::sleep(Duration::from_millis(300));
    fs::write(&page, "# New").unwrap();

    assert!(pipeline.wait_for(&page));
    // Let any trailing events drain through the debounce window
    thread::sleep(Duration::from_millis(1500));
    assert_eq!(pipeline.builds_of(&page), 1);
    pipeline.stop();
}

#[test]
fn test_new_directory_with_files_forwarded() {
    let pipeline = Pipeline::start(&[], Duration::from_millis(100));
    let staging = pipeline.temp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();
    fs::write(staging.join("page.md"), "# Moved").unwrap();

    // Appears with content already inside
    let dir = pipeline.root.join("moved");
    fs::rename(&staging, &dir).unwrap();

    assert!(pipeline.wait_for(&dir.join("page.md")));
    pipeline.stop();
}

#[test]
fn test_temp_files_not_forwarded() {
    let pipeline = Pipeline::start(&["intro"], Duration::from_millis(50));
    let swap = pipeline.root.join("intro/.intro.md.swp");
    let page = pipeline.root.join("intro/intro.md");

    fs::write(&swap, "swap").unwrap();
    fs::write(&page, "# Intro").unwrap();

    assert!(pipeline.wait_for(&page));
    assert_eq!(pipeline.builds_of(&swap), 0);
    pipeline.stop();
}

#[test]
fn test_removed_directory_does_not_stop_watching() {
    let pipeline = Pipeline::start(&["gone", "kept"], Duration::from_millis(50));

    fs::remove_dir_all(pipeline.root.join("gone")).unwrap();
    thread::sleep(Duration::from_millis(200));

    let page = pipeline.root.join("kept/page.md");
    fs::write(&page, "# Kept").unwrap();
    assert!(pipeline.wait_for(&page));
    pipeline.stop();
}

#[test]
fn test_missing_root_is_error() {
    let temp = TempDir::new().unwrap();
    let (coordinator, _worker) = Coordinator::new(Duration::from_millis(10));
    assert!(DirWatcher::new(&temp.path().join("missing"), coordinator).is_err());
}
