//! Static preview server.
//!
//! Serves the output tree straight from disk on every request, so a rebuilt
//! page is visible on the next reload. Every response carries
//! `Cache-Control: no-store`.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result, anyhow};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use super::{LIVE_RELOAD_SCRIPT_PATH, LaunchError};
use crate::utils::mime::{self, types};
use crate::{debug, log};

/// Request handler threads.
const HANDLER_THREADS: usize = 4;

/// Client script, `__RELOAD_PORT__` replaced at serve time.
const LIVE_RELOAD_JS: &str = include_str!("livereload.js");

pub struct StaticServer {
    server: Arc<Server>,
    port: u16,
    handle: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Bind `127.0.0.1:port` (0 picks a free port) and serve `root`.
    pub fn start(root: &Path, port: u16, reload_port: u16) -> Result<Self, LaunchError> {
        let server = Server::http(("127.0.0.1", port)).map_err(|source| LaunchError::Bind {
            service: "preview server",
            port,
            source,
        })?;
        let server = Arc::new(server);
        let port = server.server_addr().to_ip().map_or(port, |addr| addr.port());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(HANDLER_THREADS)
            .thread_name(|i| format!("http-{i}"))
            .build()
            .map_err(io::Error::other)?;

        let handle = {
            let server = Arc::clone(&server);
            let site = Arc::new(Site {
                root: root.to_path_buf(),
                script: LIVE_RELOAD_JS.replace("__RELOAD_PORT__", &reload_port.to_string()),
            });
            thread::Builder::new()
                .name("http".into())
                .spawn(move || run_request_loop(&server, &pool, &site))?
        };

        debug!("serve"; "http://127.0.0.1:{} -> {}", port, root.display());
        Ok(Self {
            server,
            port,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting requests and wait for the request loop to exit.
    pub fn stop(mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Site {
    root: PathBuf,
    script: String,
}

fn run_request_loop(server: &Server, pool: &rayon::ThreadPool, site: &Arc<Site>) {
    for request in server.incoming_requests() {
        let site = Arc::clone(site);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &site) {
                log!("serve"; "request error: {:#}", e);
            }
        });
    }
}

fn handle_request(request: Request, site: &Site) -> Result<()> {
    debug!("serve"; "{} {}", request.method(), request.url());

    if url_path(request.url()) == LIVE_RELOAD_SCRIPT_PATH {
        let body = site.script.clone().into_bytes();
        return respond(request, 200, types::JAVASCRIPT, body);
    }

    match resolve_path(request.url(), &site.root) {
        Some(path) => respond_file(request, &path),
        None => respond(request, 404, types::PLAIN, b"404 Not Found".to_vec()),
    }
}

fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);
    if request.method() == &Method::Head {
        return respond(request, 200, content_type, Vec::new());
    }

    let body = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    respond(request, 200, content_type, body)
}

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-store")?);
    request.respond(response)?;
    Ok(())
}

fn header(key: &str, value: &str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}

/// Resolve a request URL to a file under `root`, handling `index.html` for
/// directories.
///
/// Rejects anything that escapes `root`, including through symlinks.
fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = decode_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let canonical = root.join(&clean).canonicalize().ok()?;
    if !canonical.starts_with(root.canonicalize().ok()?) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Path part of a request URL.
fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Percent-decoded path without query or surrounding slashes.
fn decode_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let decoded = percent_decode_str(url_path(url))
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    /// Raw HTTP/1.0 exchange, returns the full response text.
    fn request(port: u16, method: &str, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(stream, "{method} {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn site() -> (TempDir, StaticServer) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("intro")).unwrap();
        fs::create_dir_all(dir.path().join("Next Steps")).unwrap();
        fs::write(dir.path().join("intro/intro.html"), "<h1>Intro</h1>").unwrap();
        fs::write(dir.path().join("Next Steps/next.html"), "<h1>Next</h1>").unwrap();
        fs::write(dir.path().join("index.html"), "<h1>Home</h1>").unwrap();

        let server = StaticServer::start(dir.path(), 0, 35999).unwrap();
        (dir, server)
    }

    #[test]
    fn test_serves_file_without_caching() {
        let (_dir, server) = site();
        let response = request(server.port(), "GET", "/intro/intro.html");

        assert!(response.starts_with("HTTP/1.1 200") || response.starts_with("HTTP/1.0 200"));
        assert!(response.contains("Cache-Control: no-store"));
        assert!(response.contains("text/html"));
        assert!(response.ends_with("<h1>Intro</h1>"));
        server.stop();
    }

    #[test]
    fn test_reads_from_disk_every_time() {
        let (dir, server) = site();
        fs::write(dir.path().join("intro/intro.html"), "<h1>Changed</h1>").unwrap();

        let response = request(server.port(), "GET", "/intro/intro.html");
        assert!(response.ends_with("<h1>Changed</h1>"));
        server.stop();
    }

    #[test]
    fn test_percent_encoded_path_and_index() {
        let (_dir, server) = site();

        assert!(request(server.port(), "GET", "/Next%20Steps/next.html").ends_with("<h1>Next</h1>"));
        assert!(request(server.port(), "GET", "/?x=1").ends_with("<h1>Home</h1>"));
        server.stop();
    }

    #[test]
    fn test_not_found_and_head() {
        let (_dir, server) = site();

        assert!(request(server.port(), "GET", "/missing.html").contains(" 404 "));

        let head = request(server.port(), "HEAD", "/intro/intro.html");
        assert!(head.contains(" 200 "));
        assert!(!head.contains("<h1>"));
        server.stop();
    }

    #[test]
    fn test_live_reload_script() {
        let (_dir, server) = site();
        let response = request(server.port(), "GET", LIVE_RELOAD_SCRIPT_PATH);

        assert!(response.contains("javascript"));
        assert!(response.contains("var port = 35999;"));
        server.stop();
    }

    #[test]
    fn test_resolve_path_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("out");
        fs::create_dir_all(&root).unwrap();
        fs::write(dir.path().join("secret.txt"), "secret").unwrap();

        assert_eq!(resolve_path("/../secret.txt", &root), None);
        assert_eq!(resolve_path("/%2e%2e/secret.txt", &root), None);
        assert_eq!(resolve_path("/", &root), None);
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("/a/b.html?x=1"), "/a/b.html");
        assert_eq!(url_path("/__livereload.js#top"), "/__livereload.js");
        assert_eq!(url_path("/"), "/");
    }
}
