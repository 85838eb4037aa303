//! Build version quads and the running executable's version lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// `major.minor.revision.build` of the build a table describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub build: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, revision: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            build,
        }
    }

    pub fn to_array(self) -> [u32; 4] {
        [self.major, self.minor, self.revision, self.build]
    }

    /// `0.0.0.0` and `1.0.0.0` are what unversioned executables report.
    pub fn is_placeholder(&self) -> bool {
        (self.major == 0 || self.major == 1)
            && self.minor == 0
            && self.revision == 0
            && self.build == 0
    }
}

impl From<[u32; 4]> for Version {
    fn from(parts: [u32; 4]) -> Self {
        Self::new(parts[0], parts[1], parts[2], parts[3])
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.build
        )
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parse a dotted quad. Trailing text after the fourth number is ignored,
    /// so `"3.0.64.38113 (retail)"` parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidVersion(s.to_string());

        let mut parts = s.trim().splitn(4, '.');
        let mut fields = [0u32; 4];
        for (i, field) in fields.iter_mut().enumerate() {
            let part = parts.next().ok_or_else(invalid)?;
            let part = if i == 3 {
                let end = part
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(part.len());
                &part[..end]
            } else {
                part
            };
            *field = part.trim().parse().map_err(|_| invalid())?;
        }

        let version = Version::from(fields);
        if version.is_placeholder() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// Source of the version of the build currently running.
pub trait VersionProvider {
    fn current_version(&self) -> Option<Version>;
}

/// Always reports the same version.
#[derive(Debug, Clone, Copy)]
pub struct FixedVersionProvider(pub Version);

impl VersionProvider for FixedVersionProvider {
    fn current_version(&self) -> Option<Version> {
        Some(self.0)
    }
}

/// Reads the version resource of the running executable.
///
/// `ProductVersion` is preferred; `FileVersion` is the fallback. Both are
/// looked up in the US-English/Unicode string table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableVersionProvider;

const VERSION_KEYS: [&str; 2] = [
    r"\StringFileInfo\040904B0\ProductVersion",
    r"\StringFileInfo\040904B0\FileVersion",
];

impl VersionProvider for ExecutableVersionProvider {
    fn current_version(&self) -> Option<Version> {
        let strings = read_executable_version_strings();
        for (key, value) in VERSION_KEYS.iter().zip(strings) {
            let Some(value) = value else { continue };
            match value.parse::<Version>() {
                Ok(version) => return Some(version),
                Err(e) => debug!("Ignoring {}: {}", key, e),
            }
        }
        None
    }
}

/// NUL-terminated UTF-16 path of the running executable, kept as raw code
/// units so unpaired surrogates survive.
#[cfg(target_os = "windows")]
fn executable_path_wide() -> Option<Vec<u16>> {
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::System::LibraryLoader::GetModuleFileNameW;

    let mut path = vec![0u16; 1024];
    loop {
        // SAFETY: a null module handle selects the executable of the current process.
        let len = unsafe { GetModuleFileNameW(HMODULE::default(), &mut path) } as usize;
        if len == 0 {
            debug!("GetModuleFileNameW failed");
            return None;
        }
        if len < path.len() {
            path.truncate(len);
            path.push(0);
            return Some(path);
        }
        // Truncated; retry with a larger buffer.
        path.resize(path.len() * 2, 0);
    }
}

#[cfg(target_os = "windows")]
fn read_executable_version_strings() -> [Option<String>; 2] {
    use windows::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW,
    };
    use windows::core::{HSTRING, PCWSTR};

    let Some(wide) = executable_path_wide() else {
        return [None, None];
    };
    let path = PCWSTR(wide.as_ptr());

    // SAFETY: queries the size of the version resource of an existing file.
    let size = unsafe { GetFileVersionInfoSizeW(path, None) };
    if size == 0 {
        debug!("Executable has no version resource");
        return [None, None];
    }

    let mut block = vec![0u8; size as usize];
    // SAFETY: `block` holds exactly `size` bytes as requested above.
    if unsafe { GetFileVersionInfoW(path, 0, size, block.as_mut_ptr().cast()) }.is_err() {
        debug!("GetFileVersionInfoW failed");
        return [None, None];
    }

    VERSION_KEYS.map(|key| {
        let mut value: *mut core::ffi::c_void = std::ptr::null_mut();
        let mut value_len: u32 = 0;
        // SAFETY: `block` is a valid version resource and outlives `value`.
        let found = unsafe {
            VerQueryValueW(
                block.as_ptr().cast(),
                &HSTRING::from(key),
                &mut value,
                &mut value_len,
            )
        }
        .as_bool();
        if !found || value.is_null() || value_len == 0 {
            return None;
        }
        // SAFETY: VerQueryValueW returns `value_len` UTF-16 units inside `block`.
        let wide = unsafe { std::slice::from_raw_parts(value as *const u16, value_len as usize) };
        let text = String::from_utf16_lossy(wide);
        let text = text.trim_end_matches('\0').to_string();
        (!text.is_empty()).then_some(text)
    })
}

#[cfg(not(target_os = "windows"))]
fn read_executable_version_strings() -> [Option<String>; 2] {
    debug!("Executable version lookup is only supported on Windows");
    [None, None]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let version: Version = "3.0.64.38113".parse().unwrap();
        assert_eq!(version, Version::new(3, 0, 64, 38113));
        assert_eq!(version.to_string(), "3.0.64.38113");
    }

    #[test]
    fn test_parse_version_with_suffix() {
        let version: Version = "1.6.1170.0 (release)".parse().unwrap();
        assert_eq!(version, Version::new(1, 6, 1170, 0));
    }

    #[test]
    fn test_parse_version_rejects_placeholders() {
        assert!("1.0.0.0".parse::<Version>().is_err());
        assert!("0.0.0.0".parse::<Version>().is_err());
        assert!("2.0.0.0".parse::<Version>().is_ok());
        assert!("1.0.0.1".parse::<Version>().is_ok());
    }

    #[test]
    fn test_parse_version_rejects_malformed() {
        for input in ["", "3.0.64", "3.0.x.1", "a.b.c.d", "3..64.1", "-1.0.0.2"] {
            assert!(input.parse::<Version>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_fixed_provider() {
        let provider = FixedVersionProvider(Version::new(1, 2, 3, 4));
        assert_eq!(provider.current_version(), Some(Version::new(1, 2, 3, 4)));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_executable_path_is_lossless() {
        use std::ffi::OsString;
        use std::os::windows::ffi::OsStringExt;

        let wide = executable_path_wide().unwrap();
        assert_eq!(wide.last(), Some(&0));
        let path = OsString::from_wide(&wide[..wide.len() - 1]);
        assert_eq!(path, std::env::current_exe().unwrap().into_os_string());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_executable_provider_unavailable_off_windows() {
        assert_eq!(ExecutableVersionProvider.current_version(), None);
    }
}
