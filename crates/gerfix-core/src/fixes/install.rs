//! Ordered fix installation against the live module.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::FixConfig;
use crate::error::{Error, Result};
use crate::hook::{FixCallback, InlineHook};
use crate::module::ModuleInfo;
use crate::pattern::BytePattern;
use crate::runtime::FixRuntime;
use crate::scan::ModuleScanner;

use super::aspect::AspectRatioFix;
use super::hud::HudConstraintFix;
use super::movie::MovieFix;
use super::resolution::ResolutionFix;
use super::{aspect, hud, resolution};

/// Inline hook handles from one install pass. Callers park these for the
/// process lifetime; dropping them would unpatch the host.
pub struct InstalledFixes {
    pub hooks: Vec<InlineHook>,
}

/// Install every enabled fix.
///
/// A failed signature or install skips that one fix and keeps going; the
/// others must still load. The movie observation point goes in first so
/// the resolution callback reads a meaningful flag from its first
/// invocation on.
pub fn install_all(
    config: &FixConfig,
    module: &ModuleInfo,
    runtime: &Arc<FixRuntime>,
) -> InstalledFixes {
    if MovieFix::enabled(config) {
        match MovieFix::install(runtime.clone()) {
            Ok(()) => info!("movie fix: file-read observation installed"),
            Err(e) => warn!("movie fix skipped: {}", e),
        }
    } else {
        info!("movie fix disabled by configuration");
    }

    // SAFETY: the image slice is only read, for the duration of this
    // install pass, and the module stays loaded throughout.
    let image = unsafe { module.image() };
    let scanner = ModuleScanner::new(image, module.base);

    let inline_fixes: [(&str, bool, &str, usize, FixCallback); 3] = [
        (
            "aspect ratio fix",
            AspectRatioFix::enabled(config),
            aspect::SIGNATURE,
            0,
            AspectRatioFix::apply,
        ),
        (
            "resolution fix",
            ResolutionFix::enabled(config),
            resolution::SIGNATURE,
            resolution::SIGNATURE_OFFSET,
            ResolutionFix::apply,
        ),
        (
            "constrain HUD fix",
            HudConstraintFix::enabled(config),
            hud::SIGNATURE,
            0,
            HudConstraintFix::apply,
        ),
    ];

    let mut hooks = Vec::new();
    for (name, enabled, signature, offset, apply) in inline_fixes {
        if !enabled {
            info!("{} disabled by configuration", name);
            continue;
        }

        match install_one(&scanner, module, runtime, name, signature, offset, apply) {
            Ok(hook) => {
                info!(
                    "{} hooked at {:#x} ({}+{:#x})",
                    name,
                    hook.site(),
                    module.name,
                    hook.site() - module.base
                );
                hooks.push(hook);
            }
            Err(e) if e.is_skippable() => warn!("{} skipped: {}", name, e),
            Err(e) => error!("{} failed: {}", name, e),
        }
    }

    InstalledFixes { hooks }
}

fn install_one(
    scanner: &ModuleScanner<'_>,
    module: &ModuleInfo,
    runtime: &Arc<FixRuntime>,
    name: &str,
    signature: &str,
    offset: usize,
    apply: FixCallback,
) -> Result<InlineHook> {
    let pattern = BytePattern::parse_with_offset(signature, offset)?;
    let site = scanner.resolve(name, &pattern)?;
    if !module.contains(site) {
        return Err(Error::HookInstall {
            address: site,
            message: "resolved site falls outside the module image".to_string(),
        });
    }
    InlineHook::install(site, runtime.clone(), apply)
}
