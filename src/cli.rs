use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::commands::{self, Session};
use crate::core::error::LauncherResult;
use crate::core::state::LauncherConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Game root directory.
    #[clap(long = "game-dir", global = true)]
    pub game_dir: Option<PathBuf>,

    /// Launcher config file. Defaults to `launcher_config.json` in the game root.
    #[clap(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Print progress records as JSON lines on stdout.
    #[clap(long = "json-progress", global = true)]
    pub json_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides applied on top of the launcher config for one run.
#[derive(Args, Debug, Clone, Default)]
pub struct ProvisionArgs {
    /// Minecraft version to install.
    #[clap(long = "game-version")]
    pub game_version: Option<String>,

    /// Loader version to install.
    #[clap(long = "loader-version", conflicts_with = "no_loader")]
    pub loader_version: Option<String>,

    /// Install plain Minecraft without a mod loader.
    #[clap(long = "no-loader")]
    pub no_loader: bool,
}

impl ProvisionArgs {
    pub fn apply(&self, config: &mut LauncherConfig) {
        if let Some(version) = &self.game_version {
            config.game_version = version.clone();
        }
        if self.no_loader {
            config.loader = None;
        } else if let (Some(version), Some(loader)) = (&self.loader_version, &mut config.loader) {
            loader.version = version.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install Java, the game, the loader and the bundle.
    Provision {
        #[command(flatten)]
        args: ProvisionArgs,
    },

    /// Provision, then start the game.
    Launch {
        #[command(flatten)]
        args: ProvisionArgs,

        /// Player name.
        #[clap(short = 'u', long = "username", default_value = "Player")]
        username: String,

        /// Account UUID. Offline UUID derived from the name when absent.
        #[clap(long = "uuid", requires = "access_token")]
        uuid: Option<String>,

        /// Microsoft access token obtained elsewhere.
        #[clap(long = "access-token", requires = "uuid")]
        access_token: Option<String>,
    },

    /// Show or reset `settings.json`.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Print host memory and launcher version.
    SystemInfo,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum SettingsAction {
    Show,
    Reset,
}

impl Cli {
    pub async fn run(self, cancel: CancellationToken) -> LauncherResult<()> {
        let session = Session::open(self.game_dir, self.config, self.json_progress, cancel)?;

        match self.command {
            Commands::Provision { args } => {
                let report = commands::provision(&session, &args).await?;
                commands::print_missing_libraries(report.missing_libraries());
                println!("Java: {}", report.java.display());
                println!("Minecraft {} ready", report.version.details.id);
            }

            Commands::Launch {
                args,
                username,
                uuid,
                access_token,
            } => {
                let account = commands::account(&username, uuid.as_deref(), access_token.as_deref());
                let outcome = commands::launch_game(&session, &args, &account).await?;
                if let Some(code) = outcome.exit_code {
                    println!("Game exited with code {}", code);
                }
            }

            Commands::Settings { action } => match action {
                SettingsAction::Show => commands::show_settings(&session)?,
                SettingsAction::Reset => commands::reset_settings(&session)?,
            },

            Commands::SystemInfo => commands::system_info()?,
        }

        Ok(())
    }
}
