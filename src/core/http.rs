use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::redirect::Policy;
use reqwest::Client;

pub const APP_USER_AGENT: &str = concat!("SheihuLauncher/", env!("CARGO_PKG_VERSION"));

/// Shared client for every upstream endpoint.
///
/// Redirects are followed by the downloader itself so that relative
/// `Location` headers and the hop limit behave the same for every request.
/// `identity` encoding keeps `Content-Length` usable for progress.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .redirect(Policy::none())
        .connect_timeout(Duration::from_secs(30))
        .build()
}
