//! Purpose: Map the running OS/CPU pair to a platform id and native library file name.
//! Exports: `OsFamily`, `Arch`, `PlatformId`, `LibraryFileName`, `resolve`, `resolve_from`,
//! `library_file_name`.
//! Role: First step of every load; pure data-driven naming, no filesystem access.
//! Invariants: `library_file_name` is deterministic for identical inputs.
//! Invariants: Naming here must agree with the table generated by `build.rs`.

use std::fmt;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
    FreeBsd,
}

impl OsFamily {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" | "mac os x" => Some(Self::MacOs),
            "windows" => Some(Self::Windows),
            "freebsd" => Some(Self::FreeBsd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::FreeBsd => "freebsd",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Aarch64,
}

impl Arch {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" => Some(Self::X86_64),
            "x86" | "i386" | "i686" => Some(Self::X86),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    fn qualifier(self) -> &'static str {
        match self {
            Self::X86 => "32",
            Self::X86_64 | Self::Aarch64 => "",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PlatformId {
    pub os: OsFamily,
    pub arch: Arch,
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.as_str(), self.arch.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LibraryFileName(String);

impl LibraryFileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibraryFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform of the current process.
pub fn resolve() -> Result<PlatformId, Error> {
    resolve_from(std::env::consts::OS, std::env::consts::ARCH)
}

pub fn resolve_from(os: &str, arch: &str) -> Result<PlatformId, Error> {
    let unsupported = || {
        Error::new(ErrorKind::UnsupportedPlatform)
            .with_message(format!("no native library naming convention for {os}/{arch}"))
    };
    let os_family = OsFamily::parse(os).ok_or_else(unsupported)?;
    let cpu = Arch::parse(arch).ok_or_else(unsupported)?;
    match (os_family, cpu) {
        (OsFamily::Linux, _) | (OsFamily::Windows, _) => {}
        (OsFamily::MacOs, Arch::X86_64 | Arch::Aarch64) => {}
        (OsFamily::FreeBsd, Arch::X86_64) => {}
        _ => return Err(unsupported()),
    }
    Ok(PlatformId {
        os: os_family,
        arch: cpu,
    })
}

pub fn library_file_name(base_name: &str, platform: PlatformId) -> LibraryFileName {
    let qualifier = platform.arch.qualifier();
    let name = match platform.os {
        OsFamily::Linux | OsFamily::FreeBsd => format!("lib{base_name}{qualifier}.so"),
        OsFamily::MacOs => format!("lib{base_name}.dylib"),
        OsFamily::Windows => format!("{base_name}{qualifier}.dll"),
    };
    LibraryFileName(name)
}

#[cfg(test)]
mod tests {
    use super::{Arch, OsFamily, PlatformId, library_file_name, resolve_from};
    use crate::core::error::ErrorKind;

    #[test]
    fn linux_x86_64_uses_plain_shared_object_name() {
        let platform = resolve_from("linux", "x86_64").expect("linux");
        assert_eq!(
            platform,
            PlatformId {
                os: OsFamily::Linux,
                arch: Arch::X86_64
            }
        );
        assert_eq!(
            library_file_name("geoclient", platform).as_str(),
            "libgeoclient.so"
        );
    }

    #[test]
    fn naming_follows_os_conventions() {
        let cases = [
            ("linux", "aarch64", "libgeoclient.so"),
            ("linux", "i686", "libgeoclient32.so"),
            ("freebsd", "amd64", "libgeoclient.so"),
            ("darwin", "arm64", "libgeoclient.dylib"),
            ("macos", "x86_64", "libgeoclient.dylib"),
            ("windows", "x86_64", "geoclient.dll"),
            ("windows", "x86", "geoclient32.dll"),
        ];
        for (os, arch, expected) in cases {
            let platform = resolve_from(os, arch).expect("supported");
            assert_eq!(library_file_name("geoclient", platform).as_str(), expected);
        }
    }

    #[test]
    fn file_name_is_deterministic() {
        for (os, arch) in [("linux", "x86_64"), ("macos", "aarch64"), ("windows", "x86")] {
            let platform = resolve_from(os, arch).expect("supported");
            let first = library_file_name("geoclient", platform);
            let second = library_file_name("geoclient", platform);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn unknown_combinations_are_unsupported() {
        for (os, arch) in [
            ("solaris", "x86_64"),
            ("linux", "riscv64"),
            ("macos", "x86"),
            ("freebsd", "aarch64"),
        ] {
            let err = resolve_from(os, arch).expect_err("unsupported");
            assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
            assert!(err.message().unwrap_or_default().contains(os));
        }
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn resolve_reports_current_process() {
        let platform = super::resolve().expect("resolve");
        assert_eq!(platform.to_string(), "linux/x86_64");
    }
}
