use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::input::{BURST_INTERVAL, CLICK_INTERVAL, KEY_INTERVAL};
use crate::layout::MapMove;
use crate::types::MatchResult;

use super::{items, skills, Context, Phase, PhaseKind, PhaseOutcome};

const RELOCATION_WAIT: Duration = Duration::from_secs(15);
const AFTER_ENDED: Duration = Duration::from_secs(1);
const INVESTMENT_WAIT: Duration = Duration::from_secs(1);

/// The investment switch is flipped on early and flipped back once after the
/// collect timeout. It never fires a third time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Investment {
    Untouched,
    Enabled,
    Reverted,
}

/// Main farming loop. Ends when the session-ended label shows up.
pub struct CollectPhase;

impl CollectPhase {
    fn toggle_investment(ctx: &Context) -> Result<()> {
        let p = ctx.layout.collect.investment_toggle;
        info!(target: "collect", "toggling investment");
        ctx.input.right_click(p.x, p.y, INVESTMENT_WAIT)?;
        Ok(())
    }

    fn refresh(ctx: &Context) -> Result<()> {
        ctx.input.press_key("f1", 3, BURST_INTERVAL)?;
        ctx.input.press_key("a", 1, KEY_INTERVAL)?;
        ctx.input.click(ctx.layout.collect.refresh_click)?;
        Ok(())
    }

    fn relocate(ctx: &Context) -> Result<()> {
        let c = &ctx.layout.collect;
        let jump = |m: MapMove| {
            ctx.input
                .move_to_map_position(m.minimap.x, m.minimap.y, m.destination.x, m.destination.y)
        };
        jump(c.relocation_out)?;
        ctx.sleeper.sleep(RELOCATION_WAIT);
        ctx.input.press_key("f2", 1, KEY_INTERVAL)?;
        jump(c.relocation_back)?;
        Ok(())
    }

    fn shop(ctx: &Context) -> Result<()> {
        let c = &ctx.layout.collect;
        ctx.input
            .move_and_click(c.shop_button.x, c.shop_button.y, c.shop_clicks, CLICK_INTERVAL)?;
        Ok(())
    }
}

impl Phase for CollectPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Collect
    }

    fn run(&self, ctx: &Context) -> Result<PhaseOutcome> {
        let t = &ctx.timings;
        let ended_label = &ctx.layout.collect.ended_label;
        let mut investment = Investment::Untouched;
        let mut relocated = false;
        let mut rerolls = 0u32;

        info!(target: "collect", "collecting");
        loop {
            ctx.pause.wait_until_resumed();
            let clock = ctx.clock();
            info!(target: "collect", "session at {}s ({})", clock.seconds, clock.label);

            if ctx.use_resources && investment == Investment::Untouched && clock.seconds < 60 {
                Self::toggle_investment(ctx)?;
                investment = Investment::Enabled;
            }

            let ended = ctx.find(ended_label);
            Self::refresh(ctx)?;
            if let MatchResult::Found { .. } = ended {
                info!(target: "collect", "session over at {}s", clock.seconds);
                ctx.click_hit(ended_label, ended)?;
                ctx.sleeper.sleep(AFTER_ENDED);
                return Ok(PhaseOutcome::Succeeded);
            }

            if investment == Investment::Enabled && clock.seconds > t.collect_timeout_secs {
                info!(target: "collect", "past {}s, reverting investment", t.collect_timeout_secs);
                Self::toggle_investment(ctx)?;
                investment = Investment::Reverted;
            }

            if !relocated && clock.seconds > t.relocation_threshold_secs {
                info!(target: "collect", "past {}s, relocating", t.relocation_threshold_secs);
                Self::relocate(ctx)?;
                relocated = true;
            }

            if clock.seconds < t.relocation_threshold_secs {
                items::sweep(ctx)?;
                if ctx.use_resources {
                    skills::upgrade(ctx, &mut rerolls)?;
                    Self::shop(ctx)?;
                }
            }

            ctx.sleeper.sleep(t.tick());
        }
    }
}
