//! Settings file model and derived display metrics.
//!
//! The settings file is loaded once before any fix installs. Everything
//! derived from it is computed once and treated as read-only for the rest
//! of the process lifetime.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// 16:9, the only aspect ratio the game supports natively.
pub const NATIVE_ASPECT_RATIO: f32 = 16.0 / 9.0;

#[derive(Debug, Clone, Deserialize)]
pub struct FixConfig {
    pub name: String,
    pub master_enable: bool,
    pub resolution: Resolution,
    pub features: Features,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Features {
    pub constrain_hud: ConstrainHud,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConstrainHud {
    pub enable: bool,
}

impl Resolution {
    /// `0` in either dimension means "use the desktop resolution".
    pub fn needs_desktop_fallback(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl FixConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Derive the display metrics, falling back to the desktop resolution
    /// when the configured one is zero in either dimension.
    pub fn metrics(&self) -> Result<DisplayMetrics> {
        let resolution = if self.resolution.needs_desktop_fallback() {
            effective_resolution(self.resolution, desktop_resolution()?)
        } else {
            self.resolution
        };
        Ok(DisplayMetrics::derive(resolution.width, resolution.height))
    }
}

/// Apply the zero-means-desktop fallback to a configured resolution.
pub fn effective_resolution(configured: Resolution, desktop: Resolution) -> Resolution {
    if configured.needs_desktop_fallback() {
        desktop
    } else {
        configured
    }
}

/// Values derived from the effective resolution.
///
/// All arithmetic stays in single precision, and the integer fields
/// truncate; the results feed float lanes in the game's own code, which
/// was built around these exact conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f32,
    /// Width of a 16:9 image at the configured height.
    pub native_width: u32,
    /// Horizontal margin on each side of a centered 16:9 image.
    pub native_offset: u32,
    pub width_scaling_factor: f32,
}

impl DisplayMetrics {
    pub fn derive(width: u32, height: u32) -> Self {
        let aspect_ratio = width as f32 / height as f32;
        let native_width = (NATIVE_ASPECT_RATIO * height as f32) as u32;
        // Narrower-than-16:9 widths wrap here; the fix targets displays
        // wider than native.
        let native_offset = (width.wrapping_sub(native_width) as f32 / 2.0) as u32;
        let width_scaling_factor = width as f32 / native_width as f32;

        Self {
            width,
            height,
            aspect_ratio,
            native_width,
            native_offset,
            width_scaling_factor,
        }
    }
}

/// Query the primary desktop resolution.
#[cfg(target_os = "windows")]
pub fn desktop_resolution() -> Result<Resolution> {
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    use crate::error::Error;

    // SAFETY: GetSystemMetrics is always safe to call.
    let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    if width <= 0 || height <= 0 {
        return Err(Error::Config(
            "failed to query desktop resolution".to_string(),
        ));
    }

    Ok(Resolution {
        width: width as u32,
        height: height as u32,
    })
}

#[cfg(not(target_os = "windows"))]
pub fn desktop_resolution() -> Result<Resolution> {
    use crate::error::Error;

    Err(Error::Config(
        "desktop resolution query is only supported on Windows".to_string(),
    ))
}
