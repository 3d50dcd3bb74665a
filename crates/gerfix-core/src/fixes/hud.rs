//! HUD-constraint fix.
//!
//! The window expansion stretches UI elements along with everything else.
//! This fix rescales the UI-transform records the game streams through a
//! vectorized load, pulling the HUD back to 16:9 proportions.
//!
//! The hooked site also sees unrelated dynamic data whose layout happens
//! to match, so a record is only touched when the two scalars at `+0x30`
//! and `+0x3C` carry the ±1.0-family top-byte patterns that mark a UI
//! transform. The underlying values drift slightly across records at
//! runtime, which is why this is a top-byte mask check and not a float
//! comparison.

use crate::config::FixConfig;
use crate::context::RegisterContext;
use crate::runtime::FixRuntime;

/// Vectorized load of a UI-transform record, `eax` holding the base.
pub const SIGNATURE: &str = "F3 0F 6F 00 F3 0F 7F 41 0C F3 0F 6F 40 10";

/// Field offsets within the transform record.
const SCALE_FIELD: u32 = 0x00;
const OFFSET_FIELD: u32 = 0x30;
const MARKER_FIELD: u32 = 0x3C;

/// Top-byte families of the two discriminator scalars.
const NEGATIVE_ONE_FAMILY: u32 = 0xBF00_0000;
const POSITIVE_ONE_FAMILY: u32 = 0x3F00_0000;

pub struct HudConstraintFix;

impl HudConstraintFix {
    pub fn enabled(config: &FixConfig) -> bool {
        config.master_enable && config.features.constrain_hud.enable
    }

    /// Rescale one transform record, or do nothing at all if it does not
    /// carry the discriminator patterns.
    pub fn apply(ctx: &mut dyn RegisterContext, runtime: &FixRuntime) {
        let base = ctx.eax();
        let (Some(scaler0), Some(scaler1)) = (
            ctx.read_u32(base.wrapping_add(OFFSET_FIELD)),
            ctx.read_u32(base.wrapping_add(MARKER_FIELD)),
        ) else {
            return;
        };

        if (scaler0 & NEGATIVE_ONE_FAMILY) != NEGATIVE_ONE_FAMILY
            || (scaler1 & POSITIVE_ONE_FAMILY) != POSITIVE_ONE_FAMILY
        {
            return;
        }

        let width = runtime.metrics.width as f32;
        let ratio = runtime.metrics.native_width as f32 / width;
        ctx.write_f32(base.wrapping_add(SCALE_FIELD), (2.0 / width) * ratio);
        ctx.write_f32(base.wrapping_add(OFFSET_FIELD), -ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConstrainHud, DisplayMetrics, Features, Resolution};
    use crate::context::MockContext;

    const BASE: u32 = 0x0200_0000;

    fn runtime() -> FixRuntime {
        FixRuntime::new(DisplayMetrics::derive(3440, 1440))
    }

    fn transform_record(scaler0: u32, scaler1: u32) -> MockContext {
        let mut ctx = MockContext::new();
        ctx.eax = BASE;
        ctx.store_u32(BASE + SCALE_FIELD, 1.0f32.to_bits());
        ctx.store_u32(BASE + OFFSET_FIELD, scaler0);
        ctx.store_u32(BASE + MARKER_FIELD, scaler1);
        ctx
    }

    fn config(master_enable: bool, constrain_hud: bool) -> FixConfig {
        FixConfig {
            name: "test".to_string(),
            master_enable,
            resolution: Resolution {
                width: 3440,
                height: 1440,
            },
            features: Features {
                constrain_hud: ConstrainHud {
                    enable: constrain_hud,
                },
            },
        }
    }

    #[test]
    fn test_needs_master_and_feature_flag() {
        assert!(HudConstraintFix::enabled(&config(true, true)));
        assert!(!HudConstraintFix::enabled(&config(true, false)));
        assert!(!HudConstraintFix::enabled(&config(false, true)));
        assert!(!HudConstraintFix::enabled(&config(false, false)));
    }

    #[test]
    fn test_rescales_matching_transform_record() {
        let runtime = runtime();
        // Exact ±1.0 bit patterns, the common case.
        let mut ctx = transform_record(0xBF80_0000, 0x3F80_0000);

        HudConstraintFix::apply(&mut ctx, &runtime);

        let ratio = 2560.0f32 / 3440.0;
        let scale = ctx.load_f32(BASE + SCALE_FIELD).unwrap();
        let offset = ctx.load_f32(BASE + OFFSET_FIELD).unwrap();
        assert_eq!(scale, (2.0 / 3440.0) * ratio);
        assert!((scale - 4.3268e-4).abs() < 1e-7);
        assert_eq!(offset, -ratio);
        assert!((offset + 0.744_186).abs() < 1e-5);
    }

    #[test]
    fn test_accepts_drifted_scalars_in_the_same_family() {
        let runtime = runtime();
        // Values vary across records; only the top-byte family matters.
        let mut ctx = transform_record(0xBF80_1234, 0x3F7F_FFFF);
        HudConstraintFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.writes.len(), 2);
    }

    #[test]
    fn test_unrelated_records_are_left_untouched() {
        let runtime = runtime();
        for (scaler0, scaler1) in [
            (0x3F80_0000, 0x3F80_0000),
            (0x3F80_0000, 0xBF80_0000),
            (0x0000_0000, 0x3F80_0000),
            (0x4120_0000, 0x4248_0000),
        ] {
            let mut ctx = transform_record(scaler0, scaler1);
            HudConstraintFix::apply(&mut ctx, &runtime);
            assert!(ctx.writes.is_empty(), "wrote for {scaler0:#x}/{scaler1:#x}");
            assert_eq!(ctx.load_f32(BASE + SCALE_FIELD), Some(1.0));
        }
    }

    #[test]
    fn test_unreadable_record_is_a_no_op() {
        let runtime = runtime();
        let mut ctx = MockContext::new();
        ctx.eax = BASE;
        HudConstraintFix::apply(&mut ctx, &runtime);
        assert!(ctx.writes.is_empty());
    }
}
