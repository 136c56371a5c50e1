// src/reload/server.rs

//! Development server for the `browser-sync` task.
//!
//! - a `tiny_http` static file server over the output root, injecting the
//!   reload client into HTML responses;
//! - a `tungstenite` WebSocket listener; every client gets its own thread
//!   forwarding [`ReloadHub`] signals.
//!
//! Both listeners retry on the next port when the configured one is taken.

use std::fs;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;

use super::client::{client_script, inject_client_tag, CLIENT_SCRIPT_PATH};
use super::{ReloadHub, ReloadSignal};
use crate::config::ServerSection;

/// Maximum port binding attempts per listener.
const MAX_PORT_RETRIES: u16 = 10;

/// Running dev server. Dropping it stops both listeners.
pub struct DevServerHandle {
    http: Arc<Server>,
    http_addr: SocketAddr,
    ws_port: u16,
    stop: Arc<AtomicBool>,
}

impl std::fmt::Debug for DevServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServerHandle")
            .field("http_addr", &self.http_addr)
            .field("ws_port", &self.ws_port)
            .finish()
    }
}

impl DevServerHandle {
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn ws_port(&self) -> u16 {
        self.ws_port
    }
}

impl Drop for DevServerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.http.unblock();
    }
}

/// Serve `base_dir` over HTTP and push `hub` signals over WebSocket.
pub fn start_dev_server(
    server_cfg: &ServerSection,
    base_dir: PathBuf,
    hub: ReloadHub,
) -> Result<DevServerHandle> {
    let ip: IpAddr = server_cfg
        .host
        .parse()
        .with_context(|| format!("invalid [server].host {:?}", server_cfg.host))?;

    let (ws_listener, ws_port) = bind_ws(ip, server_cfg.reload_port)?;
    let (http, http_addr) = bind_http(ip, server_cfg.port)?;
    let http = Arc::new(http);
    let stop = Arc::new(AtomicBool::new(false));

    {
        let stop = Arc::clone(&stop);
        thread::spawn(move || accept_ws_loop(ws_listener, hub, stop));
    }
    {
        let http = Arc::clone(&http);
        thread::spawn(move || {
            for request in http.incoming_requests() {
                if let Err(e) = handle_request(request, &base_dir, ws_port) {
                    warn!(error = %e, "request error");
                }
            }
            debug!("http request loop finished");
        });
    }

    info!(url = %format!("http://{http_addr}"), ws_port, "dev server started");

    Ok(DevServerHandle {
        http,
        http_addr,
        ws_port,
        stop,
    })
}

fn bind_http(ip: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let addr = SocketAddr::new(ip, base_port.saturating_add(offset));
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    info!(requested = base_port, port = addr.port(), "http port in use; using next free port");
                }
                let actual = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, actual));
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(anyhow!(
        "failed to bind http server after {} attempts from port {}: {}",
        MAX_PORT_RETRIES,
        base_port,
        last_error.unwrap_or_default()
    ))
}

fn bind_ws(ip: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let addr = SocketAddr::new(ip, base_port.saturating_add(offset));
        match TcpListener::bind(addr) {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                listener.set_nonblocking(true)?;
                return Ok((listener, port));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "failed to bind reload socket after {} attempts from port {}: {}",
        MAX_PORT_RETRIES,
        base_port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

fn accept_ws_loop(listener: TcpListener, hub: ReloadHub, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                debug!(%addr, "reload client connected");
                let rx = hub.subscribe();
                thread::spawn(move || serve_ws_client(stream, rx));
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                warn!(error = %e, "reload accept error");
                thread::sleep(Duration::from_millis(100));
            }
        }
    }
    debug!("reload accept loop finished");
}

fn serve_ws_client(stream: TcpStream, mut rx: broadcast::Receiver<ReloadSignal>) {
    let _ = stream.set_nonblocking(false);
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            debug!(error = %e, "reload handshake failed");
            return;
        }
    };

    loop {
        let signal = match rx.blocking_recv() {
            Ok(signal) => signal,
            // Missed signals: a full reload covers whatever they were.
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "reload client lagged");
                ReloadSignal::Reload
            }
            Err(RecvError::Closed) => break,
        };

        if let Err(e) = ws.send(Message::Text(signal.to_json().into())) {
            debug!(error = %e, "reload client gone");
            break;
        }
    }
}

fn handle_request(request: Request, base_dir: &Path, ws_port: u16) -> Result<()> {
    let url = request.url().to_string();

    if url == CLIENT_SCRIPT_PATH {
        return respond(request, 200, "application/javascript", client_script(ws_port).into_bytes());
    }

    let Some(path) = resolve_path(&url, base_dir) else {
        debug!(%url, "not found");
        return respond(request, 404, "text/plain; charset=utf-8", b"404 Not Found".to_vec());
    };

    let content_type = mime_for(&path);
    let mut body = fs::read(&path).with_context(|| format!("reading {:?}", path))?;
    if content_type.starts_with("text/html") {
        body = inject_client_tag(&body);
    }
    respond(request, 200, content_type, body)
}

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Ok(header) = Header::from_bytes(&b"Cache-Control"[..], &b"no-cache"[..]) {
        response = response.with_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Map a request URL to a file under `base_dir`, resolving directories to
/// their `index.html`. Anything escaping the root resolves to `None`.
pub fn resolve_path(url: &str, base_dir: &Path) -> Option<PathBuf> {
    let decoded = normalize_url(url)?;
    let clean = decoded.as_str();

    if clean.split('/').any(|part| part == "..") {
        return None;
    }

    let local = base_dir.join(clean);
    let canonical = local.canonicalize().ok()?;
    let root = base_dir.canonicalize().ok()?;
    if !canonical.starts_with(&root) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

/// Request path without query or fragment, percent-decoded, without
/// surrounding slashes. `None` if the decoded bytes are not UTF-8.
fn normalize_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    Some(decoded.trim_matches('/').to_string())
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_files_and_directory_indexes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("index.html"), "<body></body>").unwrap();
        fs::write(dir.path().join("blog/index.html"), "<body></body>").unwrap();
        fs::write(dir.path().join("app.css"), "a{}").unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(resolve_path("/", dir.path()), Some(root.join("index.html")));
        assert_eq!(resolve_path("/blog/", dir.path()), Some(root.join("blog/index.html")));
        assert_eq!(resolve_path("/app.css?v=2", dir.path()), Some(root.join("app.css")));
        assert_eq!(resolve_path("/missing.js", dir.path()), None);
    }

    #[test]
    fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("secret.txt"), "x").unwrap();
        assert_eq!(resolve_path("/../secret.txt", &dir.path().join("site")), None);
    }

    #[test]
    fn percent_encoded_names_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/my logo.png"), "png").unwrap();
        fs::write(dir.path().join("images/café.svg"), "<svg/>").unwrap();

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path("/images/my%20logo.png", dir.path()),
            Some(root.join("images/my logo.png"))
        );
        assert_eq!(
            resolve_path("/images/caf%C3%A9.svg?v=1", dir.path()),
            Some(root.join("images/café.svg"))
        );
        assert_eq!(resolve_path("/images/%FF.png", dir.path()), None);
    }

    #[test]
    fn encoded_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("secret.txt"), "x").unwrap();
        assert_eq!(resolve_path("/%2e%2e/secret.txt", &dir.path().join("site")), None);
        assert_eq!(resolve_path("/..%2Fsecret.txt", &dir.path().join("site")), None);
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_for(Path::new("a/INDEX.HTML")), "text/html; charset=utf-8");
        assert_eq!(mime_for(Path::new("fonts/iconfont.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("blob")), "application/octet-stream");
    }
}
