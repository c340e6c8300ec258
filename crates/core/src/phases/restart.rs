use std::time::Duration;

use anyhow::Result;
use log::{debug, info};

use crate::types::MatchResult;

use super::{Context, Phase, PhaseKind, PhaseOutcome};

const MENU_SETTLE: Duration = Duration::from_secs(1);
const CONFIRM_INTERVAL: Duration = Duration::from_secs(1);

/// Open the game menu and confirm a restart. Retries until the dialog shows.
pub struct RestartPhase;

impl Phase for RestartPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Restart
    }

    fn run(&self, ctx: &Context) -> Result<PhaseOutcome> {
        let r = &ctx.layout.restart;
        loop {
            ctx.pause.wait_until_resumed();
            ctx.input.click(r.menu)?;
            ctx.sleeper.sleep(MENU_SETTLE);

            let hit = ctx.find(&r.confirm_label);
            if let MatchResult::Found { .. } = hit {
                info!(target: "restart", "restarting");
                ctx.click_hit(&r.confirm_label, hit)?;
                ctx.sleeper.sleep(MENU_SETTLE);
                ctx.input
                    .move_and_click(r.confirm_button.x, r.confirm_button.y, 2, CONFIRM_INTERVAL)?;
                return Ok(PhaseOutcome::Completed);
            }
            debug!(target: "restart", "no restart dialog yet");
            ctx.sleeper.sleep(ctx.timings.restart_retry());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, seen, FakeScreen};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_reopens_menu_until_dialog() {
        let screen = FakeScreen::new();
        let polls = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&polls);
        screen.script(move |_| {
            if n.fetch_add(1, Ordering::SeqCst) >= 2 {
                vec![seen("重开游戏")]
            } else {
                vec![]
            }
        });
        let (ctx, sleeper) = context(&screen);
        RestartPhase.run(&ctx).unwrap();

        let label = (809 + 5, 565 + 5);
        assert_eq!(
            screen.clicks(),
            vec![(112, 955), (112, 955), (112, 955), label, label, (823, 624), (823, 624)]
        );
        let retries = sleeper.history().iter().filter(|d| **d == Duration::from_secs(5)).count();
        assert_eq!(retries, 2);
    }
}
