//! Resolution/window fix.
//!
//! The game letterboxes anything wider than 16:9. The hook feeds the
//! configured width into the register the game later uses as its render
//! window width, which removes the side bars. This is a window expansion,
//! not a viewport fix; the 3D scene itself is handled by the aspect-ratio
//! fix.
//!
//! Prerendered movies stay 16:9, so the override steps aside while one is
//! streaming; see [`movie`](super::movie) for how that is detected.

use crate::config::FixConfig;
use crate::context::RegisterContext;
use crate::runtime::FixRuntime;

/// Comparison/branch region feeding the width computation. The unique
/// match lands on the guarded multiply/divide pair; the hook belongs on
/// the call 18 bytes in, where xmm0 holds the width.
pub const SIGNATURE: &str =
    "76 ?? F3 0F 59 05 ?? ?? ?? ?? F3 0F 5E 05 ?? ?? ?? ?? E8 ?? ?? ?? ??";
pub const SIGNATURE_OFFSET: usize = 18;

pub struct ResolutionFix;

impl ResolutionFix {
    pub fn enabled(config: &FixConfig) -> bool {
        config.master_enable
    }

    /// Widen the render window, unless a movie is streaming: prerendered
    /// 16:9 video must keep the native width or it stretches.
    pub fn apply(ctx: &mut dyn RegisterContext, runtime: &FixRuntime) {
        if !runtime.movie_playing() {
            ctx.set_xmm0_lane(0, runtime.metrics.width as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayMetrics;
    use crate::context::MockContext;
    use crate::fixes::movie;

    #[test]
    fn test_overrides_width_when_no_movie_plays() {
        let runtime = FixRuntime::new(DisplayMetrics::derive(3440, 1440));
        let mut ctx = MockContext::new();
        ctx.xmm0[0] = 2560.0;

        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 3440.0);
    }

    #[test]
    fn test_native_width_passes_through_while_movie_plays() {
        let runtime = FixRuntime::new(DisplayMetrics::derive(3440, 1440));
        runtime.set_movie_playing(true);

        let mut ctx = MockContext::new();
        ctx.xmm0[0] = 2560.0;
        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 2560.0);
    }

    #[test]
    fn test_override_follows_observed_reads() {
        // The flag tracks what the file-read observation point last saw:
        // a movie read suspends the override, any other read resumes it.
        let runtime = FixRuntime::new(DisplayMetrics::derive(3440, 1440));
        let mut ctx = MockContext::new();

        ctx.xmm0[0] = 2560.0;
        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 3440.0);

        movie::observe_read_path(&runtime, r"\\?\D:\game\data\GameData\movie\op.wmv");
        ctx.xmm0[0] = 2560.0;
        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 2560.0);

        // Still streaming: repeated movie chunks keep the override off.
        movie::observe_read_path(&runtime, r"\\?\D:\game\data\GameData\movie\op.wmv");
        ctx.xmm0[0] = 2560.0;
        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 2560.0);

        movie::observe_read_path(&runtime, r"D:\game\data\script.qpck");
        ctx.xmm0[0] = 2560.0;
        ResolutionFix::apply(&mut ctx, &runtime);
        assert_eq!(ctx.xmm0[0], 3440.0);
    }
}
