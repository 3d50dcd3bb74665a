//! Movie-playback detection.
//!
//! The game never touches its movie files directly; a scripting layer
//! hands them to DirectShow, which streams them chunk by chunk through the
//! system file-read primitive. Detouring that primitive is the one
//! reliable place to see playback start and stop: while a movie streams,
//! the reads are movie-file reads, and the moment they switch back to
//! archive reads the movie is over.
//!
//! The detour is a pure observation point. It derives a path from the
//! handle argument, updates the shared flag, and delegates to the original
//! with every argument unchanged.

use std::path::Path;

use crate::config::FixConfig;
use crate::runtime::FixRuntime;

/// Movie files shipped with the game.
const MOVIE_EXTENSION: &str = "wmv";

/// Handle translation yields `\\?\`-prefixed paths; strip the volume
/// decoration before looking at the extension.
fn strip_volume_prefix(path: &str) -> &str {
    path.strip_prefix(r"\\?\").unwrap_or(path)
}

/// Whether a resolved read path is a movie being streamed.
fn is_movie_path(path: &str) -> bool {
    Path::new(strip_volume_prefix(path))
        .extension()
        .is_some_and(|ext| ext == MOVIE_EXTENSION)
}

/// Record one observed read path on the shared flag.
///
/// Classification happens on every translated read, so the first
/// non-movie read after playback clears the flag again. Reads whose
/// handle cannot be translated never reach this point; an indeterminate
/// read must not count as "movie stopped".
pub fn observe_read_path(runtime: &FixRuntime, path: &str) {
    runtime.set_movie_playing(is_movie_path(path));
}

pub struct MovieFix;

impl MovieFix {
    /// Movie detection rides the master switch; it has no signature of its
    /// own and only wires up the file-read observation point the
    /// resolution fix depends on.
    pub fn enabled(config: &FixConfig) -> bool {
        config.master_enable
    }

    /// Install the observation detour. Must run before the resolution fix
    /// starts reading the movie flag.
    #[cfg(all(target_os = "windows", target_arch = "x86"))]
    pub fn install(runtime: std::sync::Arc<FixRuntime>) -> crate::error::Result<()> {
        detour::install(runtime)
    }
}

#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod detour {
    use std::ffi::c_void;
    use std::sync::{Arc, OnceLock};

    use windows::Win32::Foundation::{BOOL, HANDLE, MAX_PATH};
    use windows::Win32::Storage::FileSystem::{FILE_NAME_NORMALIZED, GetFinalPathNameByHandleA};
    use windows::Win32::System::IO::OVERLAPPED;

    use crate::error::{Error, Result};
    use crate::hook::ApiHook;
    use crate::runtime::FixRuntime;

    pub const TARGET_MODULE: &str = "KernelBase.dll";
    pub const TARGET_SYMBOL: &str = "ReadFile";

    /// ReadFile's raw ABI; the detour forwards every argument untouched.
    type ReadFileFn =
        unsafe extern "system" fn(HANDLE, *mut c_void, u32, *mut u32, *mut OVERLAPPED) -> BOOL;

    struct ReadFileState {
        runtime: Arc<FixRuntime>,
        original: ReadFileFn,
        hook: ApiHook,
    }

    /// The detour has no closure environment; its state is parked here
    /// before the hook is enabled and is read-only afterwards.
    static STATE: OnceLock<ReadFileState> = OnceLock::new();

    pub fn install(runtime: Arc<FixRuntime>) -> Result<()> {
        let hook = ApiHook::create(TARGET_MODULE, TARGET_SYMBOL, read_file_detour as *mut c_void)?;

        // SAFETY: the trampoline reaches the original ReadFile prologue
        // and matches its ABI.
        let original: ReadFileFn = unsafe { std::mem::transmute(hook.trampoline()) };

        let target = hook.target() as usize;
        if STATE
            .set(ReadFileState {
                runtime,
                original,
                hook,
            })
            .is_err()
        {
            return Err(Error::AlreadyHooked { address: target });
        }

        // Enabled strictly after the state is parked, so a call arriving
        // on another thread always finds it.
        STATE.get().expect("state parked above").hook.enable()
    }

    unsafe extern "system" fn read_file_detour(
        hfile: HANDLE,
        lpbuffer: *mut c_void,
        bytes_to_read: u32,
        bytes_read: *mut u32,
        overlapped: *mut OVERLAPPED,
    ) -> BOOL {
        let state = STATE.get().expect("detour enabled before state was parked");

        let mut name_buf = [0u8; MAX_PATH as usize];
        // SAFETY: querying the path of the handle the host is reading
        // from; the buffer lives on this stack frame.
        let len =
            unsafe { GetFinalPathNameByHandleA(hfile, &mut name_buf, FILE_NAME_NORMALIZED) }
                as usize;
        if len > 0 && len < name_buf.len() {
            let path = String::from_utf8_lossy(&name_buf[..len]);
            super::observe_read_path(&state.runtime, &path);
        }

        // SAFETY: forwarding the untouched arguments to the original.
        unsafe { (state.original)(hfile, lpbuffer, bytes_to_read, bytes_read, overlapped) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayMetrics;

    fn runtime() -> FixRuntime {
        FixRuntime::new(DisplayMetrics::derive(3440, 1440))
    }

    #[test]
    fn test_movie_paths_are_classified_by_extension() {
        assert!(is_movie_path(r"D:\game\data\GameData\movie\op.wmv"));
        assert!(is_movie_path(r"\\?\D:\game\data\GameData\movie\op.wmv"));
        assert!(!is_movie_path(r"D:\game\data\pack0.qpck"));
        assert!(!is_movie_path(r"D:\game\data\GameData\movie\readme"));
        // The game's own comparison is exact, so case matters.
        assert!(!is_movie_path(r"D:\game\data\GameData\movie\OP.WMV"));
        // A directory named like a movie is still a movie path as far as
        // the extension check goes; only real read handles get here.
        assert!(is_movie_path(r"op.wmv"));
    }

    #[test]
    fn test_volume_prefix_is_stripped() {
        assert_eq!(strip_volume_prefix(r"\\?\C:\a\b.wmv"), r"C:\a\b.wmv");
        assert_eq!(strip_volume_prefix(r"C:\a\b.wmv"), r"C:\a\b.wmv");
    }

    #[test]
    fn test_observed_reads_drive_the_flag() {
        let runtime = runtime();

        observe_read_path(&runtime, r"\\?\D:\game\data\GameData\movie\op.wmv");
        assert!(runtime.movie_playing());

        observe_read_path(&runtime, r"\\?\D:\game\data\GameData\movie\op.wmv");
        assert!(runtime.movie_playing());

        observe_read_path(&runtime, r"D:\game\data\pack0.qpck");
        assert!(!runtime.movie_playing());
    }

    #[test]
    fn test_untranslatable_reads_leave_the_flag_alone() {
        // The detour only calls observe_read_path on successful handle
        // translation, so an unresolvable read changes nothing.
        let runtime = runtime();
        observe_read_path(&runtime, r"D:\game\data\GameData\movie\op.wmv");
        assert!(runtime.movie_playing());
        // (no observation here)
        assert!(runtime.movie_playing());
    }
}
