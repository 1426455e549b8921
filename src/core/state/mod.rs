mod config;
mod layout;
mod settings;

pub use config::{
    BundleConfig, JavaConfig, LauncherConfig, LoaderConfig, DEFAULT_BUNDLE_MARKER,
    DEFAULT_GAME_VERSION, DEFAULT_JAVA_MAJOR, DEFAULT_LOADER_VERSION,
};
pub use layout::{GameLayout, APP_DIR_NAME};
pub use settings::{
    parse_memory_mb, GameSettings, JavaChoice, JavaPreset, LauncherAction, MemorySettings,
    ResolutionSettings, SystemInfo,
};
