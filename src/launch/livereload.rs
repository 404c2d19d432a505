//! Live-reload WebSocket channel.
//!
//! ```text
//! acceptor thread ──handshake──► clients ◄── broadcast (rebuild worker)
//!                                   ▲
//! reader thread ── poll every 100ms ┘ (drops closed connections)
//! ```
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"connected","version":"0.1.0"}
//! {"type":"reload","path":"/intro/intro.html"}
//! ```

use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tungstenite::{Message, WebSocket};

use super::LaunchError;
use crate::{debug, log};

/// Poll interval of the acceptor and reader threads.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A client that connects but never finishes the handshake is dropped after this.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Message pushed to live-reload clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Sent once after the handshake.
    Connected { version: String },
    /// An artifact at URL `path` was rebuilt.
    Reload { path: String },
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(path: impl Into<String>) -> Self {
        Self::Reload { path: path.into() }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Live-reload server: accepts WebSocket clients and pushes messages to all
/// of them.
pub struct ReloadHub {
    port: u16,
    clients: Clients,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl ReloadHub {
    /// Bind `127.0.0.1:port` (0 picks a free port) and start accepting.
    pub fn start(port: u16) -> Result<Self, LaunchError> {
        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| LaunchError::Bind {
            service: "live-reload",
            port,
            source: e.into(),
        })?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;

        let clients = Clients::default();
        let stop = Arc::new(AtomicBool::new(false));

        let acceptor = {
            let clients = Arc::clone(&clients);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("reload-accept".into())
                .spawn(move || accept_loop(&listener, &clients, &stop))?
        };
        let reader = {
            let clients = Arc::clone(&clients);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("reload-read".into())
                .spawn(move || reader_loop(&clients, &stop))?
        };

        debug!("reload"; "ws://127.0.0.1:{}", port);
        Ok(Self {
            port,
            clients,
            stop,
            threads: vec![acceptor, reader],
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send `msg` to every client, dropping the ones that fail.
    ///
    /// Returns how many clients received it.
    pub fn broadcast(&self, msg: &ReloadMessage) -> usize {
        let text = Message::Text(msg.to_json().into());
        let mut clients = self.clients.lock();

        clients.retain_mut(|ws| match ws.send(text.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        clients.len()
    }

    /// Stop both threads and close every connection.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }

        for mut ws in self.clients.lock().drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}

fn accept_loop(listener: &TcpListener, clients: &Clients, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!("reload"; "client connected: {}", addr);
                if let Some(ws) = handshake(stream) {
                    let mut clients = clients.lock();
                    clients.push(ws);
                    debug!("reload"; "{} client(s)", clients.len());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log!("reload"; "accept error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Blocking handshake, then switch to non-blocking polling reads.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));

    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            log!("reload"; "handshake failed: {}", e);
            return None;
        }
    };

    if let Err(e) = ws.get_ref().set_nonblocking(true) {
        log!("reload"; "cannot poll client: {}", e);
        return None;
    }
    let connected = Message::Text(ReloadMessage::connected().to_json().into());
    if let Err(e) = ws.send(connected) {
        debug!("reload"; "client left during handshake: {}", e);
        return None;
    }
    Some(ws)
}

/// Drain incoming frames so pings get answered and closed clients go away.
fn reader_loop(clients: &Clients, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(e)) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(e) => {
                debug!("reload"; "client dropped: {}", e);
                false
            }
        });
    }
}
