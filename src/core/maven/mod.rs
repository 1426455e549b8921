mod artifact;

pub use artifact::MavenArtifact;

/// Well-known Maven repositories.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const FABRIC_MAVEN: &str = "https://maven.fabricmc.net";
pub const QUILT_MAVEN: &str = "https://maven.quiltmc.org/repository/release";
