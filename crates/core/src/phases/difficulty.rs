use anyhow::Result;
use log::{debug, info};

use crate::input::CLICK_INTERVAL;
use crate::types::MatchResult;

use super::{Context, Phase, PhaseKind, PhaseOutcome};

/// Pick the configured difficulty row in the lobby and press begin.
pub struct DifficultyPhase;

impl Phase for DifficultyPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Difficulty
    }

    fn run(&self, ctx: &Context) -> Result<PhaseOutcome> {
        let d = &ctx.layout.difficulty;
        ctx.pause.wait_until_resumed();
        loop {
            let hit = ctx.find(&d.begin_label);
            if let MatchResult::Found { .. } = hit {
                let row = d.row(ctx.difficulty);
                info!(target: "difficulty", "selecting difficulty {}", ctx.difficulty);
                ctx.input.move_and_click(row.x, row.y, 3, CLICK_INTERVAL)?;
                ctx.click_hit(&d.begin_label, hit)?;
                return Ok(PhaseOutcome::Completed);
            }
            debug!(target: "difficulty", "lobby not ready");
            ctx.sleeper.sleep(ctx.timings.difficulty_retry());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AutomationConfig;
    use crate::testing::{context_with, seen, FakeScreen};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_clicks_configured_row() {
        let screen = FakeScreen::new();
        let polls = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&polls);
        screen.script(move |_| {
            if n.fetch_add(1, Ordering::SeqCst) == 0 { vec![] } else { vec![seen("开始游戏")] }
        });
        let config = AutomationConfig { difficulty: 4, ..Default::default() };
        let (ctx, _) = context_with(&screen, &config);
        DifficultyPhase.run(&ctx).unwrap();

        let row = (953, 291 + 3 * 53);
        let begin = (1649 + 5, 939 + 5);
        assert_eq!(screen.clicks(), vec![row, row, row, begin, begin]);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }
}
