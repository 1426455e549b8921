// ─── SHEIHU Core ───
// Provisioning backend: everything needed to turn an empty directory into a
// launchable Minecraft install.
//
// Architecture:
//   core/
//     version/    Mojang manifest, version JSON, client jar + libraries
//     assets/     Asset index + object downloads
//     loaders/    Fabric / Quilt profiles and their libraries
//     java/       Bundled Java runtime download + layout normalization
//     bundle.rs   One-shot content archive
//     pipeline.rs Runs every install step in order
//     downloader/ Single-URL fetches with redirects, SHA-1 and cancellation
//     launch/     Classpath, natives, arguments, process spawn
//     auth/       Offline and caller-supplied Microsoft accounts
//     state/      Game layout, launcher config, user settings

pub mod archive;
pub mod assets;
pub mod auth;
pub mod bundle;
pub mod context;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod state;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
