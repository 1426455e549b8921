/// Operating system families the launcher distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    X64,
    X86,
    Aarch64,
}

/// Host platform as seen by version rules, native classifiers and runtime downloads.
///
/// Unknown targets resolve to windows x64, the layout the upstream metadata
/// always describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: OsKind,
    pub arch: ArchKind,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            os: OsKind::Windows,
            arch: ArchKind::X64,
        }
    }
}

impl Platform {
    pub fn new(os: OsKind, arch: ArchKind) -> Self {
        Self { os, arch }
    }

    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            OsKind::Windows
        } else if cfg!(target_os = "macos") {
            OsKind::MacOs
        } else if cfg!(target_os = "linux") {
            OsKind::Linux
        } else {
            OsKind::Windows
        };

        let arch = if cfg!(target_arch = "x86_64") {
            ArchKind::X64
        } else if cfg!(target_arch = "x86") {
            ArchKind::X86
        } else if cfg!(target_arch = "aarch64") {
            ArchKind::Aarch64
        } else {
            ArchKind::X64
        };

        Self { os, arch }
    }

    /// OS name used by Mojang rules and `natives` maps.
    pub fn mojang_os(&self) -> &'static str {
        match self.os {
            OsKind::Windows => "windows",
            OsKind::MacOs => "osx",
            OsKind::Linux => "linux",
        }
    }

    /// Arch name used by Mojang rules (`"arch": "x86"`).
    pub fn mojang_arch(&self) -> &'static str {
        match self.arch {
            ArchKind::X64 => "x86_64",
            ArchKind::X86 => "x86",
            ArchKind::Aarch64 => "arm64",
        }
    }

    /// Value substituted for `${arch}` in native classifier templates.
    pub fn arch_bits(&self) -> &'static str {
        match self.arch {
            ArchKind::X86 => "32",
            ArchKind::X64 | ArchKind::Aarch64 => "64",
        }
    }

    pub fn adoptium_os(&self) -> &'static str {
        match self.os {
            OsKind::Windows => "windows",
            OsKind::MacOs => "mac",
            OsKind::Linux => "linux",
        }
    }

    pub fn adoptium_arch(&self) -> &'static str {
        match self.arch {
            ArchKind::X64 => "x64",
            ArchKind::X86 => "x86",
            ArchKind::Aarch64 => "aarch64",
        }
    }

    pub fn java_executable(&self) -> &'static str {
        match self.os {
            OsKind::Windows => "java.exe",
            _ => "java",
        }
    }

    pub fn classpath_separator(&self) -> &'static str {
        match self.os {
            OsKind::Windows => ";",
            _ => ":",
        }
    }

    /// File extensions of native libraries packed in classifier jars.
    pub fn native_extensions(&self) -> &'static [&'static str] {
        match self.os {
            OsKind::Windows => &["dll"],
            OsKind::MacOs => &["dylib", "jnilib"],
            OsKind::Linux => &["so"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_platform_is_windows_x64() {
        let platform = Platform::default();
        assert_eq!(platform.mojang_os(), "windows");
        assert_eq!(platform.adoptium_arch(), "x64");
        assert_eq!(platform.java_executable(), "java.exe");
    }

    #[test]
    fn arch_bits_follow_pointer_width() {
        assert_eq!(Platform::new(OsKind::Linux, ArchKind::X86).arch_bits(), "32");
        assert_eq!(Platform::new(OsKind::MacOs, ArchKind::Aarch64).arch_bits(), "64");
    }
}
