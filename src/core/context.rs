use crate::core::downloader::ArtifactFetcher;
use crate::core::platform::Platform;
use crate::core::progress::ProgressSink;
use crate::core::state::GameLayout;

/// Everything an installer step needs: where files go, how they are fetched,
/// which platform they are for and who hears about progress.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    pub fetcher: &'a dyn ArtifactFetcher,
    pub layout: &'a GameLayout,
    pub platform: Platform,
    pub progress: &'a dyn ProgressSink,
}
