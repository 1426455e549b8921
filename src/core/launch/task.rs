// ─── Launch Task ───
// Builds the java command line and spawns the game process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::arguments::{contains_flag, expand, sanitize_window_args, substitute, Placeholders};
use super::classpath::{join_classpath, safe_path_str};
use crate::core::auth::Account;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderProfile;
use crate::core::platform::{OsKind, Platform};
use crate::core::state::{GameLayout, GameSettings, LauncherAction};
use crate::core::version::{Features, VersionDetails};

const LAUNCHER_NAME: &str = "sheihu-launcher";

/// Everything needed to assemble a launch command.
pub struct LaunchInput<'a> {
    pub layout: &'a GameLayout,
    pub platform: Platform,
    pub version: &'a VersionDetails,
    pub loader: Option<&'a LoaderProfile>,
    /// Loader id used as `${version_name}` when a loader is active.
    pub loader_id: Option<&'a str>,
    pub java: &'a Path,
    pub account: &'a Account,
    pub settings: &'a GameSettings,
    pub classpath: &'a [PathBuf],
    pub natives_dir: &'a Path,
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub java: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub natives_dir: PathBuf,
    pub main_class: String,
}

/// What happened after spawning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub pid: Option<u32>,
    /// Exit code when the launcher waited for the game.
    pub exit_code: Option<i32>,
}

impl LaunchPlan {
    pub fn build(input: &LaunchInput<'_>) -> LauncherResult<Self> {
        let version = input.version;
        let main_class = input
            .loader
            .map(|profile| profile.main_class.clone())
            .or_else(|| version.main_class.clone())
            .ok_or_else(|| LauncherError::Other(format!("Version {} has no mainClass", version.id)))?;

        if input.classpath.is_empty() {
            return Err(LauncherError::Other("Empty classpath".into()));
        }
        let classpath = join_classpath(input.classpath, &input.platform);

        let resolution = &input.settings.resolution;
        let mut features = Features::new();
        features.insert("has_custom_resolution".into(), !resolution.fullscreen);

        let placeholders = placeholders(input, &classpath);

        // ── JVM arguments ──
        let (min_mb, max_mb) = input.settings.memory_mb();
        let mut jvm_templates = vec![format!("-Xms{min_mb}M"), format!("-Xmx{max_mb}M")];
        match version.arguments.as_ref().filter(|a| !a.jvm.is_empty()) {
            Some(arguments) => {
                jvm_templates.extend(expand(&arguments.jvm, &input.platform, &features))
            }
            None => {
                // Pre-1.13 versions declare no JVM arguments.
                if input.platform.os == OsKind::MacOs {
                    jvm_templates.push("-XstartOnFirstThread".into());
                }
                jvm_templates.push("-Djava.library.path=${natives_directory}".into());
            }
        }
        if let Some(profile) = input.loader {
            jvm_templates.extend(profile.jvm_arguments().iter().cloned());
        }

        let mut args = substitute(&jvm_templates, &placeholders);
        if !contains_flag(&args, "-cp") && !contains_flag(&args, "-classpath") {
            args.push("-cp".into());
            args.push(classpath.clone());
        }
        args.push(main_class.clone());

        // ── Game arguments ──
        let mut game_templates = match (&version.arguments, &version.minecraft_arguments) {
            (Some(arguments), _) if !arguments.game.is_empty() => {
                expand(&arguments.game, &input.platform, &features)
            }
            (_, Some(legacy)) => legacy.split_whitespace().map(String::from).collect(),
            _ => Vec::new(),
        };
        if let Some(profile) = input.loader {
            game_templates.extend(profile.game_arguments().iter().cloned());
        }

        let mut game_args = sanitize_window_args(substitute(&game_templates, &placeholders));
        if resolution.fullscreen {
            if !contains_flag(&game_args, "--fullscreen") {
                game_args.push("--fullscreen".into());
            }
        } else if !contains_flag(&game_args, "--width") {
            game_args.extend([
                "--width".to_string(),
                resolution.width.to_string(),
                "--height".to_string(),
                resolution.height.to_string(),
            ]);
        }
        args.extend(game_args);

        Ok(Self {
            java: input.java.to_path_buf(),
            args,
            working_dir: input.layout.root().to_path_buf(),
            natives_dir: input.natives_dir.to_path_buf(),
            main_class,
        })
    }

    fn command(&self, platform: &Platform) -> Command {
        let mut cmd = Command::new(&self.java);
        cmd.args(&self.args);
        cmd.current_dir(&self.working_dir);
        configure_native_library_env(&mut cmd, platform, &self.natives_dir);
        cmd
    }
}

fn placeholders(input: &LaunchInput<'_>, classpath: &str) -> Placeholders {
    let layout = input.layout;
    let version = input.version;
    let account = input.account;
    let resolution = &input.settings.resolution;

    let mut vars = Placeholders::new();
    vars.set("auth_player_name", account.username.as_str())
        .set("auth_uuid", account.uuid.as_str())
        .set("auth_access_token", account.access_token.as_str())
        .set("auth_session", format!("token:{}", account.access_token))
        .set("auth_xuid", account.xuid.as_str())
        .set("clientid", account.client_id.as_str())
        .set("user_type", account.user_type.as_str())
        .set("user_properties", "{}")
        .set("version_name", input.loader_id.unwrap_or(&version.id))
        .set("version_type", version.version_type.as_deref().unwrap_or("release"))
        .set("game_directory", safe_path_str(layout.root()))
        .set("assets_root", safe_path_str(&layout.assets_dir()))
        .set("game_assets", safe_path_str(&layout.assets_dir()))
        .set("assets_index_name", version.asset_index_name().unwrap_or("legacy"))
        .set("library_directory", safe_path_str(&layout.libraries_dir()))
        .set("natives_directory", safe_path_str(input.natives_dir))
        .set("classpath", classpath)
        .set("classpath_separator", input.platform.classpath_separator())
        .set("launcher_name", LAUNCHER_NAME)
        .set("launcher_version", env!("CARGO_PKG_VERSION"))
        .set("resolution_width", resolution.width.to_string())
        .set("resolution_height", resolution.height.to_string());
    vars
}

/// Spawn the game.
///
/// `Close` detaches and returns right away; `Keep` and `Hide` wait for the game
/// to exit while forwarding its output to the log.
pub async fn launch(
    plan: &LaunchPlan,
    platform: &Platform,
    action: LauncherAction,
) -> LauncherResult<LaunchOutcome> {
    let mut cmd = plan.command(platform);
    info!("Launching {} with Java {:?}", plan.main_class, plan.java);
    debug!("Arguments: {:?}", redacted_args(&plan.args));

    if action == LauncherAction::Close {
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        let child = cmd
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        let pid = child.id();
        info!("Game started (pid {:?}), launcher detaching", pid);
        return Ok(LaunchOutcome {
            pid,
            exit_code: None,
        });
    }

    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
    let pid = child.id();
    info!("Game started (pid {:?})", pid);

    let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out, false)));
    let stderr = child.stderr.take().map(|err| tokio::spawn(forward_lines(err, true)));

    let status = child
        .wait()
        .await
        .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
    for task in [stdout, stderr].into_iter().flatten() {
        let _ = task.await;
    }

    if status.success() {
        info!("Game exited normally");
    } else {
        warn!("Game exited with {}", status);
    }
    Ok(LaunchOutcome {
        pid,
        exit_code: status.code(),
    })
}

const SECRET_FLAGS: [&str; 2] = ["--accessToken", "--session"];

/// Copy of `args` with token values masked, for logging.
fn redacted_args(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            redacted.push("********".to_string());
        } else {
            redacted.push(arg.clone());
        }
        mask_next = SECRET_FLAGS.contains(&arg.as_str());
    }
    redacted
}

async fn forward_lines<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!(target: "game", "{}", line);
        } else {
            info!(target: "game", "{}", line);
        }
    }
}

fn configure_native_library_env(cmd: &mut Command, platform: &Platform, natives_dir: &Path) {
    let var = match platform.os {
        OsKind::Windows => "PATH",
        OsKind::Linux => "LD_LIBRARY_PATH",
        OsKind::MacOs => "DYLD_LIBRARY_PATH",
    };
    let native_path = safe_path_str(natives_dir);
    let merged = match std::env::var(var) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", native_path, platform.classpath_separator(), existing)
        }
        _ => native_path,
    };
    cmd.env(var, merged);
}
