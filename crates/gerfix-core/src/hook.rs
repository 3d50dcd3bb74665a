//! Inline and named-export hook installation.
//!
//! Only compiled for 32-bit Windows; the target executable is an x86
//! image. Inline hooks land mid-function and dispatch to a fix callback
//! over the interrupted register block before the preserved original
//! instructions resume. Named-export detours replace a function entry and
//! keep a trampoline so the detour can delegate to the original.

use std::collections::BTreeSet;
use std::ffi::{CString, c_void};
use std::sync::{Arc, Mutex};

use ilhook::x86::{CallbackOption, HookFlags, HookPoint, HookType, Hooker, Registers};
use minhook::MinHook;
use tracing::debug;
use windows::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress};
use windows::core::PCSTR;

use crate::context::RegisterContext;
use crate::error::{Error, Result};
use crate::runtime::FixRuntime;

/// Callback type every inline hook dispatches to.
pub type FixCallback = fn(&mut dyn RegisterContext, &FixRuntime);

/// Sites currently claimed by installed inline hooks. No two controllers
/// ever target the same address; claiming a site twice is an install
/// error, not a silent re-hook.
static CLAIMED_SITES: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

fn claim_site(site: usize) -> Result<()> {
    let mut sites = CLAIMED_SITES.lock().unwrap();
    if !sites.insert(site) {
        return Err(Error::AlreadyHooked { address: site });
    }
    Ok(())
}

fn release_site(site: usize) {
    CLAIMED_SITES.lock().unwrap().remove(&site);
}

struct Dispatch {
    runtime: Arc<FixRuntime>,
    apply: FixCallback,
}

/// Jmp-back routine shared by every inline hook: wrap the raw register
/// block in a context view, run the fix callback, fall through to the
/// preserved original instructions. Nothing is returned to the host.
unsafe extern "C" fn dispatch_routine(regs: *mut Registers, user_data: usize) {
    let dispatch = unsafe { &*(user_data as *const Dispatch) };
    let mut ctx = LiveContext { regs };
    (dispatch.apply)(&mut ctx, &dispatch.runtime);
}

/// Live register view over an interrupted thread's saved register block.
struct LiveContext {
    regs: *mut Registers,
}

impl RegisterContext for LiveContext {
    fn xmm0_lane(&self, lane: usize) -> f32 {
        let xmm0 = unsafe { (*self.regs).xmm0 };
        f32::from_bits((xmm0 >> (lane * 32)) as u32)
    }

    fn set_xmm0_lane(&mut self, lane: usize, value: f32) {
        let shift = lane * 32;
        let mask = !(u128::from(u32::MAX) << shift);
        // SAFETY: the register block is exclusively ours for the duration
        // of the callback; ilhook restores it into xmm0 afterwards.
        unsafe {
            let xmm0 = (*self.regs).xmm0;
            (*self.regs).xmm0 = (xmm0 & mask) | (u128::from(value.to_bits()) << shift);
        }
    }

    fn eax(&self) -> u32 {
        unsafe { (*self.regs).eax }
    }

    fn read_u32(&self, address: u32) -> Option<u32> {
        if address == 0 {
            return None;
        }
        // SAFETY: callbacks only read fields of the record the hooked code
        // itself is dereferencing at this instant.
        Some(unsafe { std::ptr::read_unaligned(address as *const u32) })
    }

    fn write_f32(&mut self, address: u32, value: f32) -> bool {
        if address == 0 {
            return false;
        }
        // SAFETY: same record as above; the fields are writable game data.
        unsafe { std::ptr::write_unaligned(address as *mut f32, value) };
        true
    }
}

/// One installed inline hook: a resolved site, its callback wiring, and
/// its enabled state.
pub struct InlineHook {
    site: usize,
    dispatch: &'static Dispatch,
    point: Option<HookPoint>,
}

impl InlineHook {
    /// Install a jmp-back hook at `site`. The callback then runs
    /// synchronously on whichever host thread reaches the site, before the
    /// original instruction stream resumes.
    pub fn install(site: usize, runtime: Arc<FixRuntime>, apply: FixCallback) -> Result<Self> {
        claim_site(site)?;

        // Hooks live for the process lifetime; the dispatch block is
        // leaked so the routine can reference it from any host thread.
        let dispatch: &'static Dispatch = Box::leak(Box::new(Dispatch { runtime, apply }));
        let mut hook = Self {
            site,
            dispatch,
            point: None,
        };

        if let Err(e) = hook.arm() {
            release_site(site);
            return Err(e);
        }
        Ok(hook)
    }

    fn arm(&mut self) -> Result<()> {
        let hooker = Hooker::new(
            self.site,
            HookType::JmpBack(dispatch_routine),
            CallbackOption::None,
            self.dispatch as *const Dispatch as usize,
            HookFlags::empty(),
        );

        // SAFETY: the site was matched inside the module's mapped image and
        // is claimed exclusively by this handle; ilhook preserves whole
        // instructions when it steals the patch bytes.
        let point = unsafe { hooker.hook() }.map_err(|e| Error::HookInstall {
            address: self.site,
            message: format!("{:?}", e),
        })?;
        self.point = Some(point);
        debug!("inline hook armed at {:#x}", self.site);
        Ok(())
    }

    /// Re-install a disabled hook at its original site.
    pub fn enable(&mut self) -> Result<()> {
        if self.point.is_some() {
            return Ok(());
        }
        claim_site(self.site)?;
        if let Err(e) = self.arm() {
            release_site(self.site);
            return Err(e);
        }
        Ok(())
    }

    /// Restore the original bytes at the site, byte for byte; the host
    /// then behaves as if it was never patched.
    pub fn disable(&mut self) {
        if let Some(point) = self.point.take() {
            drop(point);
            release_site(self.site);
            debug!("inline hook disarmed at {:#x}", self.site);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.point.is_some()
    }

    pub fn site(&self) -> usize {
        self.site
    }
}

impl Drop for InlineHook {
    fn drop(&mut self) {
        self.disable();
    }
}

/// A detour on a named export, with a trampoline to the original.
///
/// Used for hooks into system libraries, where a stable exported symbol
/// makes signature scanning unnecessary.
pub struct ApiHook {
    target: *mut c_void,
    trampoline: *mut c_void,
}

// SAFETY: both pointers refer to code locations resolved once and never
// moved; the handle itself carries no thread-affine state.
unsafe impl Send for ApiHook {}
unsafe impl Sync for ApiHook {}

impl ApiHook {
    /// Resolve `module!symbol` and prepare a detour to `detour`. The hook
    /// is created disabled so the caller can park the trampoline where the
    /// detour will find it before any call is redirected.
    pub fn create(module: &str, symbol: &str, detour: *mut c_void) -> Result<Self> {
        let target = resolve_export(module, symbol)?;

        // SAFETY: target is a live export and detour matches its ABI.
        let trampoline =
            unsafe { MinHook::create_hook(target, detour) }.map_err(|e| Error::HookInstall {
                address: target as usize,
                message: format!("{:?}", e),
            })?;

        Ok(Self { target, trampoline })
    }

    /// Start redirecting calls through the detour.
    pub fn enable(&self) -> Result<()> {
        // SAFETY: the hook at `target` was created above.
        unsafe { MinHook::enable_hook(self.target) }.map_err(|e| Error::HookInstall {
            address: self.target as usize,
            message: format!("{:?}", e),
        })
    }

    /// Entry point that reaches the original function.
    pub fn trampoline(&self) -> *mut c_void {
        self.trampoline
    }

    pub fn target(&self) -> *mut c_void {
        self.target
    }
}

/// Address of a named export.
pub fn resolve_export(module: &str, symbol: &str) -> Result<*mut c_void> {
    let unresolved = || Error::ExportResolve {
        module: module.to_string(),
        symbol: symbol.to_string(),
    };

    let module_name = CString::new(module).map_err(|_| unresolved())?;
    let symbol_name = CString::new(symbol).map_err(|_| unresolved())?;

    // SAFETY: both strings are NUL-terminated and outlive the calls.
    unsafe {
        let handle =
            GetModuleHandleA(PCSTR(module_name.as_ptr().cast())).map_err(|_| unresolved())?;
        let address = GetProcAddress(handle, PCSTR(symbol_name.as_ptr().cast()))
            .ok_or_else(unresolved)?;
        Ok(address as *mut c_void)
    }
}
