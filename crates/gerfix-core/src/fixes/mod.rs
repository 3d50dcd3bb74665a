//! Fix controllers.
//!
//! Each controller owns one signature, one enable predicate derived from
//! the configuration, and one callback. Callbacks are plain functions over
//! the [`RegisterContext`](crate::context::RegisterContext) view so they
//! can be exercised against a mock context; installation wires them
//! through the scanner and the hook installer.

pub mod aspect;
pub mod hud;
pub mod movie;
pub mod resolution;

#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod install;

pub use aspect::AspectRatioFix;
pub use hud::HudConstraintFix;
pub use movie::MovieFix;
pub use resolution::ResolutionFix;

#[cfg(all(target_os = "windows", target_arch = "x86"))]
pub use install::{InstalledFixes, install_all};
