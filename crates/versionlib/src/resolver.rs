//! Module base address lookup.

use std::collections::HashMap;

use tracing::debug;

/// Maps a module name to its load address in the current process.
///
/// `None` as the name selects the primary executable.
pub trait ModuleResolver {
    fn resolve(&self, name: Option<&str>) -> Option<u64>;
}

/// Asks the OS loader of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessModuleResolver;

impl ModuleResolver for ProcessModuleResolver {
    #[cfg(target_os = "windows")]
    fn resolve(&self, name: Option<&str>) -> Option<u64> {
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::core::{HSTRING, PCWSTR};

        // SAFETY: GetModuleHandleW does not take ownership of the name and does
        // not increment the module's reference count.
        let handle = match name {
            Some(name) => unsafe { GetModuleHandleW(&HSTRING::from(name)) },
            None => unsafe { GetModuleHandleW(PCWSTR::null()) },
        };

        match handle {
            Ok(handle) if !handle.is_invalid() => Some(handle.0 as usize as u64),
            Ok(_) => None,
            Err(e) => {
                debug!("GetModuleHandleW({:?}) failed: {}", name, e);
                None
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn resolve(&self, name: Option<&str>) -> Option<u64> {
        debug!(
            "Module lookup for {:?} is only supported on Windows",
            name.unwrap_or("<primary>")
        );
        None
    }
}

/// Resolves from a fixed set of known bases. Names match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct FixedModuleResolver {
    primary: Option<u64>,
    modules: HashMap<String, u64>,
}

impl FixedModuleResolver {
    /// Resolver that knows only the primary module.
    pub fn new(primary: u64) -> Self {
        Self {
            primary: Some(primary),
            modules: HashMap::new(),
        }
    }

    pub fn with_module(mut self, name: &str, base: u64) -> Self {
        self.modules.insert(name.to_ascii_lowercase(), base);
        self
    }
}

impl ModuleResolver for FixedModuleResolver {
    fn resolve(&self, name: Option<&str>) -> Option<u64> {
        match name {
            None => self.primary,
            Some(name) => self.modules.get(&name.to_ascii_lowercase()).copied(),
        }
    }
}

/// Never resolves anything; address queries always miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModuleResolver;

impl ModuleResolver for NoModuleResolver {
    fn resolve(&self, _name: Option<&str>) -> Option<u64> {
        None
    }
}
