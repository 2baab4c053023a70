//! Platform, architecture and OS version detection

use std::fmt;

/// Platforms the manual tests are written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    #[value(name = "macos")]
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    /// Get the current platform
    pub fn current() -> Self {
        // Git Bash / MSYS2 shells report as Windows regardless of target quirks
        if std::env::var_os("MSYSTEM").is_some() {
            return Platform::Windows;
        }

        #[cfg(target_os = "macos")]
        return Platform::MacOS;

        #[cfg(target_os = "windows")]
        return Platform::Windows;

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        return Platform::Linux;
    }

    /// Tag used in test definitions and report file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOS => "macos",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized CPU architecture (`x86_64`, `aarch64`, ...)
pub fn detect_arch() -> String {
    normalize_arch(std::env::consts::ARCH)
}

fn normalize_arch(machine: &str) -> String {
    match machine.to_lowercase().as_str() {
        "amd64" | "x86_64" => "x86_64".to_string(),
        "arm64" | "aarch64" => "aarch64".to_string(),
        other => other.to_string(),
    }
}

/// Human-readable OS version, e.g. `macOS 14.5` or `Ubuntu 24.04`
pub fn detect_os_version() -> String {
    let info = os_info::get();
    let name = match info.os_type() {
        os_info::Type::Macos => "macOS".to_string(),
        other => other.to_string(),
    };

    match info.version() {
        os_info::Version::Unknown => name,
        version => format!("{} {}", name, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_aliases() {
        assert_eq!(normalize_arch("AMD64"), "x86_64");
        assert_eq!(normalize_arch("arm64"), "aarch64");
        assert_eq!(normalize_arch("riscv64"), "riscv64");
    }

    #[test]
    fn test_platform_tags() {
        assert_eq!(Platform::MacOS.to_string(), "macos");
        assert_eq!(Platform::Linux.as_str(), "linux");
        assert_eq!(Platform::Windows.as_str(), "windows");
    }

    #[test]
    fn test_os_version_not_empty() {
        assert!(!detect_os_version().is_empty());
    }
}
