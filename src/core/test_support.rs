// Shared fixtures for unit tests: a tiny HTTP/1.1 server and an in-memory fetcher.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::core::downloader::{ArtifactFetcher, FetchOutcome, FetchRequest};
use crate::core::error::{LauncherError, LauncherResult};

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sheihu-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Build an in-memory zip from `(name, contents)` pairs; names ending in `/` are directories.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    declared_len: Option<usize>,
}

impl MockResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            declared_len: None,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        let mut response = Self::ok(serde_json::to_vec(value).unwrap());
        response
            .headers
            .push(("Content-Type".into(), "application/json".into()));
        response
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            headers: vec![("Location".into(), location.into())],
            body: Vec::new(),
            declared_len: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            declared_len: None,
        }
    }

    /// Sends `body` but announces `declared_len` bytes, then closes the connection.
    pub fn truncated(body: Vec<u8>, declared_len: usize) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            declared_len: Some(declared_len),
        }
    }
}

#[derive(Default)]
struct ServerState {
    routes: HashMap<String, MockResponse>,
    requests: Vec<String>,
}

/// Minimal HTTP server bound to localhost; unknown paths answer 404.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));

        let shared = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = shared.clone();
                tokio::spawn(async move {
                    let _ = serve_connection(stream, shared).await;
                });
            }
        });

        Self { addr, state, task }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn route(&self, path: &str, response: MockResponse) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), response);
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|p| p.as_str() == path).count()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<ServerState>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0_u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        head.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&head);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let response = {
        let mut state = state.lock().unwrap();
        state.requests.push(path.clone());
        state
            .routes
            .get(&path)
            .cloned()
            .unwrap_or_else(|| MockResponse::status(404))
    };

    let reason = match response.status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    let content_length = response.declared_len.unwrap_or(response.body.len());
    out.push_str(&format!("Content-Length: {content_length}\r\n"));
    out.push_str("Connection: close\r\n");
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");

    stream.write_all(out.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// In-memory fetcher recording every call; unknown URLs fail with HTTP 404.
#[derive(Default)]
pub struct RecordingFetcher {
    texts: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, url: &str, body: impl Into<String>) {
        self.texts.lock().unwrap().insert(url.to_string(), body.into());
    }

    pub fn json(&self, url: &str, value: &serde_json::Value) {
        self.text(url, value.to_string());
    }

    pub fn file(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(url.to_string(), body.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == url).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn not_found(url: &str) -> LauncherError {
        LauncherError::HttpStatus {
            url: url.to_string(),
            status: 404,
            reason: "Not Found".into(),
        }
    }
}

#[async_trait]
impl ArtifactFetcher for RecordingFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> LauncherResult<FetchOutcome> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if request.dest.exists() {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let body = self
            .files
            .lock()
            .unwrap()
            .get(request.url)
            .cloned()
            .ok_or_else(|| Self::not_found(request.url))?;

        write_file(request.dest, &body);
        if let Some(on_progress) = request.on_progress {
            on_progress(100.0);
        }
        Ok(FetchOutcome::Downloaded)
    }

    async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.texts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url))
    }
}

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
