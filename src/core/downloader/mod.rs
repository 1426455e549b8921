mod client;

pub use client::{
    fetch_json, sha1_file, ArtifactFetcher, Downloader, FetchOutcome, FetchRequest, ProgressFn,
    MAX_REDIRECTS,
};
