use anyhow::Result;
use log::{debug, info};

use crate::input::{BURST_INTERVAL, CLICK_INTERVAL, KEY_INTERVAL};
use crate::types::Point;

use super::Context;

/// One skill-pick attempt followed by the rebirth click sequence.
///
/// `rerolls` counts refreshes spent during the current collect phase; no
/// attempt is made once it reaches the configured budget.
pub fn upgrade(ctx: &Context, rerolls: &mut u32) -> Result<()> {
    let skills = &ctx.layout.skills;

    if *rerolls < ctx.timings.reroll_budget {
        ctx.input.click(skills.trigger)?;
        if ctx.find(&skills.marker).is_found() {
            *rerolls += 1;
            let offered = ctx.vision.list_matches(skills.candidates);
            let pick = skills
                .priority
                .iter()
                .find_map(|name| offered.iter().find(|m| m.text.contains(name.as_str())));
            match pick {
                Some(m) => {
                    info!(target: "skills", "picking {} ({}/{})", m.text, rerolls, ctx.timings.reroll_budget);
                    ctx.input.click(Point::new(m.x, m.y))?;
                }
                None => {
                    debug!(target: "skills", "no preferred skill offered");
                    let d = skills.default_pick;
                    ctx.input.move_and_click(d.at.x, d.at.y, d.clicks, CLICK_INTERVAL)?;
                }
            }
        }
    }

    rebirth(ctx)
}

fn rebirth(ctx: &Context) -> Result<()> {
    ctx.input.press_key("f1", 2, BURST_INTERVAL)?;
    ctx.input.press_key("a", 1, KEY_INTERVAL)?;
    for step in &ctx.layout.skills.rebirth {
        ctx.input.move_and_click(step.at.x, step.at.y, step.clicks, CLICK_INTERVAL)?;
    }
    Ok(())
}
