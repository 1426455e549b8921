mod installer;
mod kind;
mod profile;

pub use installer::{LoaderInstall, LoaderInstaller};
pub use kind::LoaderKind;
pub use profile::{LoaderProfile, ProfileArguments, ProfileLibrary};
