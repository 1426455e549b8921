// ─── Provisioning Pipeline ───
// Runtime → version (client, libraries, assets) → loader → bundle.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::bundle::{ensure_bundle, BundleRequest};
use crate::core::context::InstallContext;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{adoptium_binary_url, ensure_runtime, RuntimeRequest};
use crate::core::loaders::{LoaderInstall, LoaderInstaller};
use crate::core::progress::{Phase, ProgressEvent};
use crate::core::state::{JavaChoice, JavaPreset, LauncherConfig};
use crate::core::version::{install_version, AssetOptions, ResolvedVersion};

/// Outcome of a full provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub java: PathBuf,
    pub version: ResolvedVersion,
    pub loader: Option<LoaderInstall>,
    pub bundle_installed: bool,
}

impl ProvisionReport {
    /// Loader libraries that could not be fetched from any mirror.
    pub fn missing_libraries(&self) -> &[String] {
        self.loader
            .as_ref()
            .map_or(&[], |loader| loader.missing_libraries.as_slice())
    }
}

/// Runs every install step in order, each one skipping work already on disk.
pub struct Provisioner<'a> {
    config: &'a LauncherConfig,
    java: &'a JavaChoice,
}

impl<'a> Provisioner<'a> {
    pub fn new(config: &'a LauncherConfig, java: &'a JavaChoice) -> Self {
        Self { config, java }
    }

    pub async fn run(&self, ctx: InstallContext<'_>) -> LauncherResult<ProvisionReport> {
        let config = self.config;

        let java = self.provision_java(ctx).await?;

        let version = install_version(
            ctx,
            &config.manifest_url,
            &config.game_version,
            AssetOptions {
                resources_url: &config.resources_url,
                concurrency: config.asset_concurrency,
            },
        )
        .await?;

        if let Some(required) = version.details.required_java_major() {
            let bundled = matches!(self.java, JavaChoice::Named(JavaPreset::Bundled));
            if bundled && required != config.java.major {
                warn!(
                    "Minecraft {} asks for Java {}, bundled runtime is Java {}",
                    config.game_version, required, config.java.major
                );
            }
        }

        let loader = match &config.loader {
            Some(loader) => {
                let mut installer =
                    LoaderInstaller::new(loader.kind, &config.game_version, &loader.version)
                        .with_fallback_maven(loader.fallback_maven.as_str());
                if let Some(meta_url) = &loader.meta_url {
                    installer = installer.with_meta_base(meta_url.as_str());
                }
                Some(installer.install(ctx).await?)
            }
            None => None,
        };

        let bundle_installed = match &config.bundle {
            Some(bundle) => {
                let request = BundleRequest::new(&bundle.url, ctx.layout.root(), &bundle.marker);
                ensure_bundle(ctx, &request).await?
            }
            None => false,
        };

        ctx.progress
            .emit(ProgressEvent::new(Phase::Launch, "Ready to launch", 100));
        info!("Provisioning of {} complete", config.game_version);

        Ok(ProvisionReport {
            java,
            version,
            loader,
            bundle_installed,
        })
    }

    async fn provision_java(&self, ctx: InstallContext<'_>) -> LauncherResult<PathBuf> {
        match self.java {
            JavaChoice::Named(JavaPreset::Bundled) => {
                let java = &self.config.java;
                let url = java
                    .url
                    .clone()
                    .unwrap_or_else(|| adoptium_binary_url(java.major, &ctx.platform));
                let install_root = ctx.layout.runtime_dir();
                let request = RuntimeRequest {
                    url: &url,
                    install_root: &install_root,
                    sha256: java.sha256.as_deref(),
                    dir_prefix: &java.dir_prefix,
                };
                ensure_runtime(ctx, &request).await
            }
            JavaChoice::Path(path) => {
                if !path.is_file() {
                    return Err(LauncherError::JavaExecution(format!(
                        "Configured Java not found: {:?}",
                        path
                    )));
                }
                info!("Using configured Java at {:?}", path);
                Ok(path.clone())
            }
        }
    }
}
