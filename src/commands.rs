use std::path::PathBuf;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ProvisionArgs;
use crate::core::auth::Account;
use crate::core::context::InstallContext;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::{
    build_classpath, extract_natives, launch, LaunchInput, LaunchOutcome, LaunchPlan,
};
use crate::core::loaders::LoaderProfile;
use crate::core::pipeline::{ProvisionReport, Provisioner};
use crate::core::platform::Platform;
use crate::core::progress::{ChannelProgress, ProgressEvent};
use crate::core::state::{GameLayout, GameSettings, LauncherConfig, SystemInfo};

/// Paths and process-wide handles shared by every command.
pub struct Session {
    pub layout: GameLayout,
    pub config_path: PathBuf,
    pub platform: Platform,
    json_progress: bool,
    cancel: CancellationToken,
}

impl Session {
    pub fn open(
        game_dir: Option<PathBuf>,
        config_path: Option<PathBuf>,
        json_progress: bool,
        cancel: CancellationToken,
    ) -> LauncherResult<Self> {
        let layout = GameLayout::new(game_dir.unwrap_or_else(GameLayout::default_root));
        std::fs::create_dir_all(layout.root()).map_err(|e| LauncherError::io(layout.root(), e))?;
        let config_path = config_path.unwrap_or_else(|| layout.config_file());

        Ok(Self {
            layout,
            config_path,
            platform: Platform::current(),
            json_progress,
            cancel,
        })
    }

    pub fn config(&self) -> LauncherResult<LauncherConfig> {
        LauncherConfig::load_or_init(&self.config_path)
    }

    pub fn settings(&self) -> GameSettings {
        GameSettings::load(&self.layout.settings_file())
    }
}

pub async fn provision(session: &Session, args: &ProvisionArgs) -> LauncherResult<ProvisionReport> {
    let mut config = session.config()?;
    args.apply(&mut config);
    let settings = session.settings();

    let downloader =
        Downloader::new(session.cancel.clone())?.with_max_redirects(config.max_redirects);
    let (tx, rx) = mpsc::unbounded_channel();
    let reporter = tokio::spawn(report_progress(rx, session.json_progress));
    let progress = ChannelProgress(tx);

    let ctx = InstallContext {
        fetcher: &downloader,
        layout: &session.layout,
        platform: session.platform,
        progress: &progress,
    };
    let result = Provisioner::new(&config, &settings.java).run(ctx).await;

    drop(progress);
    if let Err(e) = reporter.await {
        warn!("Progress reporter stopped: {}", e);
    }
    result
}

pub async fn launch_game(
    session: &Session,
    args: &ProvisionArgs,
    account: &Account,
) -> LauncherResult<LaunchOutcome> {
    let report = provision(session, args).await?;
    print_missing_libraries(report.missing_libraries());

    if session.cancel.is_cancelled() {
        return Err(LauncherError::Cancelled);
    }

    let settings = session.settings();
    let layout = &session.layout;
    let platform = session.platform;
    let details = &report.version.details;

    let loader_profile = report
        .loader
        .as_ref()
        .map(|loader| LoaderProfile::load(&layout.version_json(&loader.id)))
        .transpose()?;

    let classpath = build_classpath(layout, &platform, details, loader_profile.as_ref())?;
    let natives_dir = extract_natives(layout, &platform, details).await?;

    let plan = LaunchPlan::build(&LaunchInput {
        layout,
        platform,
        version: details,
        loader: loader_profile.as_ref(),
        loader_id: report.loader.as_ref().map(|loader| loader.id.as_str()),
        java: &report.java,
        account,
        settings: &settings,
        classpath: &classpath,
        natives_dir: &natives_dir,
    })?;

    launch(&plan, &platform, settings.launcher_action).await
}

/// Microsoft account when both a UUID and a token are given, offline otherwise.
pub fn account(username: &str, uuid: Option<&str>, access_token: Option<&str>) -> Account {
    match (uuid, access_token) {
        (Some(uuid), Some(token)) => Account::microsoft(username, uuid, token),
        _ => Account::offline(username),
    }
}

pub fn print_missing_libraries(missing: &[String]) {
    if missing.is_empty() {
        return;
    }
    eprintln!(
        "Warning: {} loader libraries could not be downloaded:",
        missing.len()
    );
    for coordinate in missing {
        eprintln!("  - {}", coordinate);
    }
}

pub fn show_settings(session: &Session) -> LauncherResult<()> {
    let settings = session.settings();
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn reset_settings(session: &Session) -> LauncherResult<()> {
    let path = session.layout.settings_file();
    GameSettings::default().save(&path)?;
    info!("Settings reset to defaults at {:?}", path);
    Ok(())
}

pub fn system_info() -> LauncherResult<()> {
    println!("{}", serde_json::to_string_pretty(&SystemInfo::collect())?);
    Ok(())
}

async fn report_progress(mut rx: UnboundedReceiver<ProgressEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Could not encode progress event: {}", e),
            }
        } else {
            info!(target: "progress", "[{:>3}%] {}", event.current, event.label);
        }
    }
}
