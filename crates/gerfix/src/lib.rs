//! gerfix payload DLL.
//!
//! Loaded into the game process by an ASI loader (or any DLL injector).
//! On attach it spins up one worker thread that loads `gerfix.toml`,
//! resolves the main module, installs the fixes, and exits; from then on
//! the hook callbacks run on the host's own threads.
//!
//! Build target: `i686-pc-windows-msvc` (the game is a 32-bit image).

#![cfg(all(target_os = "windows", target_arch = "x86"))]

use std::ffi::c_void;
use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use windows::Win32::Foundation::{BOOL, HMODULE};
use windows::Win32::System::LibraryLoader::DisableThreadLibraryCalls;
use windows::Win32::System::SystemServices::DLL_PROCESS_ATTACH;
use windows::Win32::System::Threading::{
    GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_HIGHEST,
};

use gerfix_core::{FixConfig, FixRuntime, current_exe_module, install_all};

const CONFIG_FILE: &str = "gerfix.toml";
const LOG_FILE: &str = "gerfix.log";

#[unsafe(no_mangle)]
extern "system" fn DllMain(module: HMODULE, reason: u32, _reserved: *mut c_void) -> BOOL {
    if reason == DLL_PROCESS_ATTACH {
        // SAFETY: standard bookkeeping on our own module handle.
        unsafe {
            let _ = DisableThreadLibraryCalls(module);
        }

        // The loader lock is held here; all real work happens on a worker
        // thread that runs the install sequence once and exits.
        std::thread::spawn(|| {
            // SAFETY: raising our own worker's priority so the hooks are
            // in place before the game gets far.
            unsafe {
                let _ = SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_HIGHEST);
            }
            if let Err(e) = attach() {
                error!("attach failed: {:#}", e);
            }
        });
    }
    BOOL::from(true)
}

/// The one-shot install sequence: logging, configuration, module
/// resolution, hooks. Ordering matters only in that the movie observation
/// point precedes the resolution fix, which `install_all` guarantees.
fn attach() -> Result<()> {
    // A failed log setup leaves tracing with no subscriber; installation
    // still proceeds, it just runs quietly.
    let _ = init_logging();

    info!("-------------------------------------");
    info!("gerfix {}", env!("CARGO_PKG_VERSION"));

    let module = current_exe_module().context("module resolution failed; no fixes installed")?;
    info!("module name: {}", module.name);
    info!("module path: {}", module.path.display());
    info!("module base: {:#x} ({:#x} bytes)", module.base, module.size);

    let config =
        FixConfig::load(CONFIG_FILE).with_context(|| format!("failed to load {}", CONFIG_FILE))?;
    let metrics = config
        .metrics()
        .context("failed to derive display metrics")?;

    info!("name: {}", config.name);
    info!("master_enable: {}", config.master_enable);
    info!("constrain_hud: {}", config.features.constrain_hud.enable);
    info!("resolution: {}x{}", metrics.width, metrics.height);
    info!("aspect ratio: {}", metrics.aspect_ratio);
    info!("native width: {}", metrics.native_width);
    info!("native offset: {}", metrics.native_offset);
    info!("width scaling factor: {}", metrics.width_scaling_factor);

    let runtime = Arc::new(FixRuntime::new(metrics));
    let fixes = install_all(&config, &module, &runtime);
    info!("{} inline hook(s) active", fixes.hooks.len());

    // Hooks stay installed until the process exits; there is no detach
    // path in normal operation.
    std::mem::forget(fixes);

    Ok(())
}

/// Route tracing output to an append-only log file next to the game
/// executable. Logging failures must not take fix installation down, so a
/// lost subscriber race is ignored.
fn init_logging() -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("failed to open {}", LOG_FILE))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}
