//! Aspect-ratio fix.
//!
//! The game only supports 16:9 and recomputes its live aspect-ratio scalar
//! continuously during 3D rendering. The hook lands on the single
//! instruction that stores that scalar from xmm0 and replaces the value
//! with the configured ratio just before the store executes.

use crate::config::FixConfig;
use crate::context::RegisterContext;
use crate::runtime::FixRuntime;

/// `movss [aspect], xmm0` followed by the call/epilogue bytes that make
/// the store site unique within the module.
pub const SIGNATURE: &str = "F3 0F 11 05 ?? ?? ?? ?? E8 ?? ?? ?? ?? 89 EC";

pub struct AspectRatioFix;

impl AspectRatioFix {
    pub fn enabled(config: &FixConfig) -> bool {
        config.master_enable
    }

    /// Replace the ratio about to be stored with the configured one.
    pub fn apply(ctx: &mut dyn RegisterContext, runtime: &FixRuntime) {
        ctx.set_xmm0_lane(0, runtime.metrics.aspect_ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstrainHud, DisplayMetrics, Features, Resolution};
    use crate::context::MockContext;

    fn config(master_enable: bool) -> FixConfig {
        FixConfig {
            name: "test".to_string(),
            master_enable,
            resolution: Resolution {
                width: 3440,
                height: 1440,
            },
            features: Features {
                constrain_hud: ConstrainHud { enable: false },
            },
        }
    }

    #[test]
    fn test_gated_by_master_enable() {
        assert!(AspectRatioFix::enabled(&config(true)));
        assert!(!AspectRatioFix::enabled(&config(false)));
    }

    #[test]
    fn test_overwrites_first_float_lane() {
        let runtime = FixRuntime::new(DisplayMetrics::derive(3440, 1440));
        let mut ctx = MockContext::new();
        ctx.xmm0 = [16.0 / 9.0, 1.0, 2.0, 3.0];

        AspectRatioFix::apply(&mut ctx, &runtime);

        assert!((ctx.xmm0[0] - 2.388_889).abs() < 1e-4);
        // Remaining lanes stay untouched.
        assert_eq!(ctx.xmm0[1..], [1.0, 2.0, 3.0]);
    }
}
