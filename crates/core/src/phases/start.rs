use anyhow::Result;
use log::{debug, info};

use super::{Context, Phase, PhaseKind, PhaseOutcome};

/// Wait for the first minute of a fresh session, then walk to the opening spot.
pub struct StartPhase;

impl Phase for StartPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Start
    }

    fn run(&self, ctx: &Context) -> Result<PhaseOutcome> {
        ctx.pause.wait_until_resumed();
        info!(target: "start", "waiting for a new session");
        loop {
            let clock = ctx.clock();
            if clock.seconds > 0 && clock.seconds < 60 {
                info!(target: "start", "session running ({})", clock.label);
                break;
            }
            debug!(target: "start", "clock at {}s, retrying", clock.seconds);
            ctx.sleeper.sleep(ctx.timings.start_retry());
        }

        let m = ctx.layout.start.opening_move;
        ctx.input
            .move_to_map_position(m.minimap.x, m.minimap.y, m.destination.x, m.destination.y)?;
        Ok(PhaseOutcome::Completed)
    }
}
