use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use crate::input::KEY_INTERVAL;
use crate::types::{MatchResult, Point};

use super::{Context, Phase, PhaseKind, PhaseOutcome};

const MENU_SETTLE: Duration = Duration::from_secs(1);
const LONG_SETTLE: Duration = Duration::from_secs(6);
const MISS_WAIT: Duration = Duration::from_secs(3);

/// Run the end-of-session archive challenge and collect its rewards.
pub struct ArchivePhase;

impl ArchivePhase {
    fn collect_rewards(ctx: &Context) -> Result<()> {
        let a = &ctx.layout.archive;
        let offered = ctx.vision.list_matches(a.rewards);
        for filter in &a.reward_filters {
            for m in offered.iter().filter(|m| m.text.contains(filter.as_str())) {
                info!(target: "archive", "taking {}", m.text);
                ctx.input.click(Point::new(m.x, m.y))?;
            }
        }
        Ok(())
    }
}

impl Phase for ArchivePhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Archive
    }

    fn run(&self, ctx: &Context) -> Result<PhaseOutcome> {
        let a = &ctx.layout.archive;
        ctx.pause.wait_until_resumed();
        info!(target: "archive", "archiving");

        ctx.input.press_key("f2", 1, KEY_INTERVAL)?;
        for p in &a.menu_clicks {
            ctx.input.click(*p)?;
            ctx.sleeper.sleep(MENU_SETTLE);
        }
        ctx.input.attack_move(a.rally_minimap, a.rally_point)?;

        let mut confirmed = false;
        for attempt in 1..=a.attempts {
            let hit = ctx.find(&a.confirm_label);
            ctx.sleeper.sleep(LONG_SETTLE);
            if let MatchResult::Found { .. } = hit {
                info!(target: "archive", "challenge finished after {} poll(s)", attempt);
                Self::collect_rewards(ctx)?;
                ctx.click_hit(&a.confirm_label, hit)?;
                confirmed = true;
                break;
            }
            ctx.sleeper.sleep(MISS_WAIT);
        }
        if !confirmed {
            warn!(target: "archive", "no confirmation after {} polls", a.attempts);
        }

        ctx.input.press_key("f2", 2, KEY_INTERVAL)?;
        Ok(PhaseOutcome::Completed)
    }
}
