use anyhow::Result;
use log::{debug, info};

use crate::input::KEY_INTERVAL;
use crate::types::{MatchResult, Point};
use crate::vision::DEFAULT_IMAGE_THRESHOLD;

use super::Context;

/// Spend every consumable on the item bar, one per round, until no rule's icon
/// shows up or the round cap is reached. Returns the number of items used.
pub fn sweep(ctx: &Context) -> Result<u32> {
    let items = &ctx.layout.items;
    ctx.pause.wait_until_resumed();

    for round in 0..items.rounds {
        ctx.input.press_key("f1", 1, KEY_INTERVAL)?;

        let hit = items.rules.iter().find_map(|rule| {
            match ctx.vision.find_image(&rule.template, items.icon_region, DEFAULT_IMAGE_THRESHOLD) {
                MatchResult::Found { x, y, .. } => Some((rule, Point::new(x, y))),
                MatchResult::NotFound => None,
            }
        });
        let Some((rule, icon)) = hit else {
            debug!(target: "items", "nothing left after {} round(s)", round);
            return Ok(round);
        };

        info!(target: "items", "using {}", rule.template.display());
        ctx.input.click(icon)?;

        let choice = rule.targets.iter().find_map(|t| {
            let found = ctx.find(t);
            found.is_found().then_some((t, found))
        });
        match (choice, rule.fallback) {
            (Some((target, found)), _) => ctx.click_hit(target, found)?,
            (None, Some(fallback)) => ctx.input.double_click(fallback)?,
            (None, None) => {}
        }
    }
    Ok(items.rounds)
}
