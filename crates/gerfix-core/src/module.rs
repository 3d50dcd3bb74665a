//! Main-module resolution for the host process.
//!
//! Resolved once at startup and reused by every fix controller; the base
//! address and size bound all signature scans and hook sites.

use std::path::PathBuf;

use crate::error::Result;

/// Base address and in-memory size of the host process's primary
/// executable image.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub base: usize,
    pub size: usize,
    pub name: String,
    pub path: PathBuf,
}

impl ModuleInfo {
    /// The mapped image bytes, for in-process signature scanning.
    ///
    /// # Safety
    ///
    /// The returned slice aliases the live pages of the running module.
    /// Callers may only read it, and only while the module stays loaded
    /// (which it does for the process lifetime; unloading is not handled).
    #[cfg(target_os = "windows")]
    pub unsafe fn image(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base as *const u8, self.size) }
    }

    /// Whether `address` falls inside the module image.
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.base + self.size
    }
}

/// Resolve the current process's main executable module.
#[cfg(target_os = "windows")]
pub fn current_exe_module() -> Result<ModuleInfo> {
    use windows::Win32::System::LibraryLoader::{GetModuleFileNameA, GetModuleHandleA};
    use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
    use windows::Win32::System::Threading::GetCurrentProcess;

    use crate::error::Error;

    // SAFETY: queries the current process's own main module; the MODULEINFO
    // out-param and the path buffer live on this stack frame.
    unsafe {
        let module = GetModuleHandleA(None)
            .map_err(|e| Error::ModuleResolve(format!("GetModuleHandleA: {e}")))?;

        let mut info = MODULEINFO::default();
        GetModuleInformation(
            GetCurrentProcess(),
            module,
            &mut info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
        .map_err(|e| Error::ModuleResolve(format!("GetModuleInformation: {e}")))?;

        let mut raw_path = [0u8; 260];
        let len = GetModuleFileNameA(module, &mut raw_path) as usize;
        let path = PathBuf::from(String::from_utf8_lossy(&raw_path[..len]).into_owned());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(ModuleInfo {
            base: info.lpBaseOfDll as usize,
            size: info.SizeOfImage as usize,
            name,
            path,
        })
    }
}

#[cfg(not(target_os = "windows"))]
pub fn current_exe_module() -> Result<ModuleInfo> {
    use crate::error::Error;

    Err(Error::ModuleResolve(
        "module resolution is only supported on Windows".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let module = ModuleInfo {
            base: 0x0040_0000,
            size: 0x1000,
            name: "ger.exe".to_string(),
            path: PathBuf::from("ger.exe"),
        };
        assert!(module.contains(0x0040_0000));
        assert!(module.contains(0x0040_0FFF));
        assert!(!module.contains(0x0040_1000));
        assert!(!module.contains(0x003F_FFFF));
    }
}
