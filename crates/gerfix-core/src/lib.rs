//! # gerfix-core
//!
//! Core library for the gerfix runtime patcher.
//!
//! This crate provides:
//! - Byte signature patterns with wildcards, and scanning over a module image
//! - Resolution of the host process's main executable module
//! - Inline hooks dispatching to callbacks over a register-context view
//! - A named-export detour on the system file-read primitive
//! - The four display fixes and the runtime state they share
//!
//! Hook installation only compiles for 32-bit Windows, the architecture of
//! the target executable. Pattern parsing, scanning, configuration, and
//! every fix callback are portable and unit-tested everywhere.

pub mod config;
pub mod context;
pub mod error;
pub mod fixes;
pub mod module;
pub mod pattern;
pub mod runtime;
pub mod scan;

#[cfg(all(target_os = "windows", target_arch = "x86"))]
pub mod hook;

pub use config::{DisplayMetrics, FixConfig, Resolution, effective_resolution};
pub use context::RegisterContext;
pub use error::{Error, Result};
pub use fixes::{AspectRatioFix, HudConstraintFix, MovieFix, ResolutionFix};
pub use module::{ModuleInfo, current_exe_module};
pub use pattern::BytePattern;
pub use runtime::FixRuntime;
pub use scan::ModuleScanner;

#[cfg(all(target_os = "windows", target_arch = "x86"))]
pub use fixes::{InstalledFixes, install_all};
#[cfg(all(target_os = "windows", target_arch = "x86"))]
pub use hook::{ApiHook, InlineHook};
