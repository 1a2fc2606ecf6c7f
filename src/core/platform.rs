//! Upstream naming of the running operating system and architecture.

use std::fmt;

/// OS/arch pair as spelled in release asset names (`linux`/`amd64`, `darwin`/`arm64`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Platform the binary was compiled for.
    pub fn detect() -> Self {
        Self::new(
            os_name(std::env::consts::OS),
            arch_name(std::env::consts::ARCH),
        )
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Archive suffix used by toolchain downloads for this platform.
    pub fn archive_ext(&self) -> &'static str {
        if self.is_windows() {
            "zip"
        } else {
            "tar.gz"
        }
    }

    /// Architecture label used in toolchain archive names; 32-bit ARM Linux ships as `armv6l`.
    pub fn toolchain_arch(&self) -> &str {
        if self.os == "linux" && self.arch == "arm" {
            "armv6l"
        } else {
            &self.arch
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn os_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upstream_names() {
        assert_eq!(os_name("macos"), "darwin");
        assert_eq!(os_name("linux"), "linux");
        assert_eq!(arch_name("x86_64"), "amd64");
        assert_eq!(arch_name("aarch64"), "arm64");
        assert_eq!(arch_name("x86"), "386");
    }

    #[test]
    fn test_archive_ext() {
        assert_eq!(Platform::new("windows", "amd64").archive_ext(), "zip");
        assert_eq!(Platform::new("linux", "amd64").archive_ext(), "tar.gz");
    }

    #[test]
    fn test_toolchain_arch() {
        assert_eq!(Platform::new("linux", "arm").toolchain_arch(), "armv6l");
        assert_eq!(Platform::new("darwin", "arm64").toolchain_arch(), "arm64");
    }

    #[test]
    fn test_detect_is_not_empty() {
        let platform = Platform::detect();
        assert!(!platform.os.is_empty());
        assert!(!platform.arch.is_empty());
    }
}
