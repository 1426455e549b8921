use std::future::Future;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

/// Upper bound on redirect hops for a single request.
pub const MAX_REDIRECTS: usize = 10;

/// Percentage callback (`0.0..=100.0`).
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Result of a fetch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    /// The destination already existed; nothing was requested.
    AlreadyPresent,
}

/// A single artifact to download.
#[derive(Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub dest: &'a Path,
    pub sha1: Option<&'a str>,
    pub on_progress: Option<ProgressFn<'a>>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str, dest: &'a Path) -> Self {
        Self {
            url,
            dest,
            sha1: None,
            on_progress: None,
        }
    }

    pub fn sha1(mut self, sha1: Option<&'a str>) -> Self {
        self.sha1 = sha1;
        self
    }

    pub fn on_progress(mut self, callback: ProgressFn<'a>) -> Self {
        self.on_progress = Some(callback);
        self
    }
}

/// Everything the installers need from the network.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download `request.url` into `request.dest` unless the destination exists.
    ///
    /// On failure the destination does not exist afterwards.
    async fn fetch(&self, request: FetchRequest<'_>) -> LauncherResult<FetchOutcome>;

    /// GET a document as text.
    async fn fetch_text(&self, url: &str) -> LauncherResult<String>;
}

/// GET and parse a JSON document.
pub async fn fetch_json<T, F>(fetcher: &F, url: &str) -> LauncherResult<T>
where
    T: DeserializeOwned,
    F: ArtifactFetcher + ?Sized,
{
    let raw = fetcher.fetch_text(url).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// HTTP implementation of [`ArtifactFetcher`].
///
/// Follows redirects itself (bounded), streams bodies to disk and aborts any
/// in-flight request once the cancellation token fires.
pub struct Downloader {
    client: Client,
    max_redirects: usize,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(cancel: CancellationToken) -> LauncherResult<Self> {
        Ok(Self::with_client(build_http_client()?, cancel))
    }

    pub fn with_client(client: Client, cancel: CancellationToken) -> Self {
        Self {
            client,
            max_redirects: MAX_REDIRECTS,
            cancel,
        }
    }

    pub fn with_max_redirects(mut self, n: usize) -> Self {
        self.max_redirects = n;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> LauncherResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LauncherError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// GET `url`, following 301/302/307/308 up to `max_redirects` hops.
    ///
    /// Only the terminal response is returned; its status is 2xx.
    async fn get_following_redirects(&self, url: &str) -> LauncherResult<Response> {
        let mut current =
            Url::parse(url).map_err(|e| LauncherError::InvalidUrl(format!("{url}: {e}")))?;
        let mut hops = 0;

        loop {
            let response = self
                .cancellable(self.client.get(current.clone()).send())
                .await??;
            let status = response.status();

            if is_followed_redirect(status) {
                if let Some(location) = response.headers().get(LOCATION) {
                    if hops >= self.max_redirects {
                        return Err(LauncherError::TooManyRedirects {
                            url: url.to_string(),
                            limit: self.max_redirects,
                        });
                    }
                    let location = location.to_str().map_err(|e| {
                        LauncherError::InvalidUrl(format!("Location header from {current}: {e}"))
                    })?;
                    let next = current.join(location).map_err(|e| {
                        LauncherError::InvalidUrl(format!("{location} (from {current}): {e}"))
                    })?;
                    debug!("Redirecting: {} -> {}", current, next);
                    current = next;
                    hops += 1;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(LauncherError::HttpStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }

            return Ok(response);
        }
    }

    async fn stream_to_file(
        &self,
        response: Response,
        request: &FetchRequest<'_>,
    ) -> LauncherResult<u64> {
        let dest = request.dest;
        let total_bytes = response.content_length().filter(|len| *len > 0);
        let mut hasher = request.sha1.map(|_| Sha1::new());

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        let mut stream = response.bytes_stream();
        let mut received = 0_u64;
        while let Some(chunk) = self.cancellable(stream.next()).await? {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }

            received += chunk.len() as u64;
            if let (Some(total), Some(on_progress)) = (total_bytes, request.on_progress) {
                on_progress(received as f64 / total as f64 * 100.0);
            }
        }

        file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        // The handle must be closed before the file can be removed on Windows.
        drop(file);

        if let (Some(expected), Some(hasher)) = (request.sha1, hasher) {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::ChecksumMismatch {
                    path: dest.to_path_buf(),
                    algorithm: "SHA-1",
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(received)
    }
}

#[async_trait]
impl ArtifactFetcher for Downloader {
    async fn fetch(&self, request: FetchRequest<'_>) -> LauncherResult<FetchOutcome> {
        let dest = request.dest;
        if dest.try_exists().unwrap_or(false) {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.get_following_redirects(request.url).await?;

        let guard = PartialFile::new(dest);
        let received = self.stream_to_file(response, &request).await?;
        guard.commit();

        debug!("Downloaded: {} -> {:?} ({} bytes)", request.url, dest, received);
        Ok(FetchOutcome::Downloaded)
    }

    async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.get_following_redirects(url).await?;
        Ok(self.cancellable(response.text()).await??)
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Removes a destination file unless the write that produced it completed.
///
/// Also covers futures dropped mid-download (cancellation, aborted batches).
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// SHA-1 of a file on disk, lowercase hex.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha1::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::test_support::{sha1_hex, temp_dir, MockResponse, MockServer};

    fn downloader() -> Downloader {
        Downloader::new(CancellationToken::new()).unwrap()
    }

    #[tokio::test]
    async fn existing_destination_makes_no_request() {
        let server = MockServer::start().await;
        server.route("/client.jar", MockResponse::ok(b"fresh".to_vec()));
        let dir = temp_dir("fetch-existing");
        let dest = dir.join("client.jar");
        std::fs::write(&dest, b"cached").unwrap();

        let url = server.url("/client.jar");
        let outcome = downloader()
            .fetch(FetchRequest::new(&url, &dest))
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
        assert!(server.requests().is_empty());
        assert_eq!(std::fs::read(&dest).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn creates_parent_directories_and_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7_u8; 64 * 1024];
        server.route("/lib.jar", MockResponse::ok(body.clone()));
        let dir = temp_dir("fetch-progress");
        let dest = dir.join("a").join("b").join("lib.jar");

        let seen = Mutex::new(Vec::new());
        let on_progress = |percent: f64| seen.lock().unwrap().push(percent);
        let url = server.url("/lib.jar");
        let outcome = downloader()
            .fetch(FetchRequest::new(&url, &dest).on_progress(&on_progress))
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!((seen.last().copied().unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn redirect_chain_ends_in_single_terminal_get() {
        let server = MockServer::start().await;
        server.route("/start", MockResponse::redirect(302, "/hop/one"));
        server.route("/hop/one", MockResponse::redirect(301, "two"));
        let absolute = server.url("/final.jar");
        server.route("/hop/two", MockResponse::redirect(307, &absolute));
        server.route("/final.jar", MockResponse::ok(b"payload".to_vec()));
        let dir = temp_dir("fetch-redirect");
        let dest = dir.join("final.jar");

        let url = server.url("/start");
        downloader()
            .fetch(FetchRequest::new(&url, &dest))
            .await
            .unwrap();

        assert_eq!(
            server.requests(),
            vec!["/start", "/hop/one", "/hop/two", "/final.jar"]
        );
        assert_eq!(server.hits("/final.jar"), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn redirect_loop_is_bounded() {
        let server = MockServer::start().await;
        server.route("/loop", MockResponse::redirect(308, "/loop"));
        let dir = temp_dir("fetch-loop");
        let dest = dir.join("never.jar");

        let url = server.url("/loop");
        let err = downloader()
            .with_max_redirects(3)
            .fetch(FetchRequest::new(&url, &dest))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::TooManyRedirects { limit: 3, .. }));
        assert_eq!(server.hits("/loop"), 4);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn non_success_status_fails_without_creating_file() {
        let server = MockServer::start().await;
        let dir = temp_dir("fetch-404");
        let dest = dir.join("missing.jar");

        let url = server.url("/missing.jar");
        let err = downloader()
            .fetch(FetchRequest::new(&url, &dest))
            .await
            .unwrap_err();

        match err {
            LauncherError::HttpStatus { status, reason, .. } => {
                assert_eq!(status, 404);
                assert_eq!(reason, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn truncated_body_removes_partial_file() {
        let server = MockServer::start().await;
        server.route(
            "/broken.zip",
            MockResponse::truncated(vec![1_u8; 4096], 1024 * 1024),
        );
        let dir = temp_dir("fetch-truncated");
        let dest = dir.join("broken.zip");

        let url = server.url("/broken.zip");
        let result = downloader().fetch(FetchRequest::new(&url, &dest)).await;

        assert!(result.is_err());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn checksum_mismatch_removes_file() {
        let server = MockServer::start().await;
        server.route("/asset", MockResponse::ok(b"tampered".to_vec()));
        let dir = temp_dir("fetch-sha1");
        let dest = dir.join("asset");
        let expected = sha1_hex(b"original");

        let url = server.url("/asset");
        let err = downloader()
            .fetch(FetchRequest::new(&url, &dest).sha1(Some(&expected)))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::ChecksumMismatch { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn matching_checksum_is_accepted() {
        let server = MockServer::start().await;
        server.route("/asset", MockResponse::ok(b"original".to_vec()));
        let dir = temp_dir("fetch-sha1-ok");
        let dest = dir.join("asset");
        let expected = sha1_hex(b"original");

        let url = server.url("/asset");
        downloader()
            .fetch(FetchRequest::new(&url, &dest).sha1(Some(&expected)))
            .await
            .unwrap();

        assert_eq!(sha1_file(&dest).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_any_write() {
        let server = MockServer::start().await;
        server.route("/slow", MockResponse::ok(b"data".to_vec()));
        let dir = temp_dir("fetch-cancel");
        let dest = dir.join("slow");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let url = server.url("/slow");
        let err = Downloader::new(cancel)
            .unwrap()
            .fetch(FetchRequest::new(&url, &dest))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn fetch_json_follows_relative_redirects() {
        let server = MockServer::start().await;
        server.route("/meta/latest", MockResponse::redirect(302, "v2/manifest.json"));
        server.route(
            "/meta/v2/manifest.json",
            MockResponse::json(&serde_json::json!({"versions": []})),
        );

        let url = server.url("/meta/latest");
        let value: serde_json::Value = fetch_json(&downloader(), &url).await.unwrap();

        assert_eq!(value["versions"], serde_json::json!([]));
    }
}
