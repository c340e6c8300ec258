//! Synthetic mouse and keyboard input with pause gating and bounds checks.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::error::InputError;
use crate::pause::PauseController;
use crate::platform::Platform;
use crate::sleep::Sleeper;
use crate::types::*;

pub const CLICK_INTERVAL: Duration = Duration::from_millis(200);
pub const KEY_INTERVAL: Duration = Duration::from_millis(500);
pub const BURST_INTERVAL: Duration = Duration::from_millis(100);

const MOVE_SETTLE: Duration = Duration::from_millis(50);
const AFTER_ACTION: Duration = Duration::from_millis(500);
const RIGHT_PRESS_DELAY: Duration = Duration::from_millis(10);
const HOLD: Duration = Duration::from_millis(20);
const MACRO_STEP: Duration = Duration::from_secs(1);

/// Resolve a key name (case-insensitive) to its virtual-key code.
pub fn virtual_key(name: &str) -> Result<VirtualKey, InputError> {
    let lower = name.trim().to_ascii_lowercase();
    let code = match lower.as_str() {
        s if s.len() == 1 && s.as_bytes()[0].is_ascii_lowercase() => s.as_bytes()[0].to_ascii_uppercase() as u16,
        s if s.len() == 1 && s.as_bytes()[0].is_ascii_digit() => s.as_bytes()[0] as u16,
        s if s.starts_with('f') && s.len() > 1 => match s[1..].parse::<u16>() {
            Ok(n @ 1..=12) => 0x6F + n,
            _ => return Err(InputError::UnmappedKey(name.to_string())),
        },
        "backspace" => 0x08,
        "tab" => 0x09,
        "enter" | "return" => 0x0D,
        "shift" => 0x10,
        "ctrl" | "control" => 0x11,
        "alt" => 0x12,
        "pause" => 0x13,
        "capslock" => 0x14,
        "esc" | "escape" => 0x1B,
        "space" => 0x20,
        "pageup" => 0x21,
        "pagedown" => 0x22,
        "end" => 0x23,
        "home" => 0x24,
        "left" => 0x25,
        "up" => 0x26,
        "right" => 0x27,
        "down" => 0x28,
        "printscreen" => 0x2C,
        "insert" => 0x2D,
        "delete" => 0x2E,
        "numlock" => 0x90,
        "scrolllock" => 0x91,
        _ => return Err(InputError::UnmappedKey(name.to_string())),
    };
    Ok(VirtualKey(code))
}

fn injection(e: anyhow::Error) -> InputError {
    InputError::Injection(format!("{:#}", e))
}

/// The input synthesizer. Every public operation blocks while paused.
pub struct Input {
    platform: Arc<dyn Platform>,
    pause: Arc<PauseController>,
    sleeper: Arc<dyn Sleeper>,
}

impl Input {
    pub fn new(platform: Arc<dyn Platform>, pause: Arc<PauseController>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { platform, pause, sleeper }
    }

    fn on_screen(&self, x: i32, y: i32) -> bool {
        let (w, h) = self.platform.screen_size();
        (0..=w).contains(&x) && (0..=h).contains(&y)
    }

    pub fn move_and_click(&self, x: i32, y: i32, clicks: u32, interval: Duration) -> Result<(), InputError> {
        self.pause.wait_until_resumed();
        self.click_unchecked(x, y, clicks, interval)
    }

    /// Single left click with the default interval.
    pub fn click(&self, p: Point) -> Result<(), InputError> {
        self.move_and_click(p.x, p.y, 1, CLICK_INTERVAL)
    }

    pub fn double_click(&self, p: Point) -> Result<(), InputError> {
        self.move_and_click(p.x, p.y, 2, CLICK_INTERVAL)
    }

    /// Right click. The pointer stays where the click happened.
    pub fn right_click(&self, x: i32, y: i32, wait: Duration) -> Result<(), InputError> {
        self.pause.wait_until_resumed();
        if !self.on_screen(x, y) {
            warn!(target: "input", "right click skipped, bad coordinate ({}, {})", x, y);
            return Ok(());
        }
        debug!(target: "input", "right click ({}, {})", x, y);
        self.platform.move_pointer(x, y).map_err(injection)?;
        self.sleeper.sleep(RIGHT_PRESS_DELAY);
        self.platform.button(MouseButton::Right, true).map_err(injection)?;
        self.sleeper.sleep(HOLD);
        self.platform.button(MouseButton::Right, false).map_err(injection)?;
        self.sleeper.sleep(wait);
        Ok(())
    }

    pub fn press_key(&self, name: &str, presses: u32, interval: Duration) -> Result<(), InputError> {
        let key = virtual_key(name)?;
        self.pause.wait_until_resumed();
        self.press_unchecked(key, presses, interval)
    }

    /// Walk the hero to a map location: minimap jump, attack-move, hold.
    /// Pause is checked once; the macro then runs to completion.
    pub fn move_to_map_position(&self, small_x: i32, small_y: i32, big_x: i32, big_y: i32) -> Result<(), InputError> {
        let (f1, a, d) = (virtual_key("f1")?, virtual_key("a")?, virtual_key("d")?);
        self.pause.wait_until_resumed();
        debug!(target: "input", "map jump ({}, {}) -> ({}, {})", small_x, small_y, big_x, big_y);

        self.click_unchecked(small_x, small_y, 2, MACRO_STEP)?;
        self.sleeper.sleep(MACRO_STEP);
        self.click_unchecked(big_x, big_y, 1, MACRO_STEP)?;
        self.press_unchecked(f1, 1, BURST_INTERVAL)?;
        self.press_unchecked(a, 1, KEY_INTERVAL)?;
        self.click_unchecked(big_x, big_y, 1, MACRO_STEP)?;
        self.sleeper.sleep(MACRO_STEP);
        self.press_unchecked(d, 5, MACRO_STEP)
    }

    /// Select all units, optionally jump the camera via the minimap, then attack-move to `target`.
    pub fn attack_move(&self, minimap: Option<Point>, target: Point) -> Result<(), InputError> {
        let (f1, a) = (virtual_key("f1")?, virtual_key("a")?);
        self.pause.wait_until_resumed();
        self.press_unchecked(f1, 3, KEY_INTERVAL)?;
        if let Some(m) = minimap {
            self.click_unchecked(m.x, m.y, 1, CLICK_INTERVAL)?;
        }
        self.press_unchecked(a, 1, KEY_INTERVAL)?;
        self.click_unchecked(target.x, target.y, 1, CLICK_INTERVAL)
    }

    fn click_unchecked(&self, x: i32, y: i32, clicks: u32, interval: Duration) -> Result<(), InputError> {
        if !self.on_screen(x, y) {
            warn!(target: "input", "click skipped, bad coordinate ({}, {})", x, y);
            return Ok(());
        }
        debug!(target: "input", "click ({}, {}) x{}", x, y, clicks);
        self.platform.move_pointer(x, y).map_err(injection)?;
        self.sleeper.sleep(MOVE_SETTLE);
        for _ in 0..clicks {
            self.platform.move_pointer(x, y).map_err(injection)?;
            self.platform.button(MouseButton::Left, true).map_err(injection)?;
            self.platform.button(MouseButton::Left, false).map_err(injection)?;
            self.sleeper.sleep(interval);
        }
        self.sleeper.sleep(AFTER_ACTION);
        Ok(())
    }

    fn press_unchecked(&self, key: VirtualKey, presses: u32, interval: Duration) -> Result<(), InputError> {
        debug!(target: "input", "key 0x{:02X} x{}", key.0, presses);
        for _ in 0..presses {
            self.platform.key(key, true).map_err(injection)?;
            self.sleeper.sleep(HOLD);
            self.platform.key(key, false).map_err(injection)?;
            self.sleeper.sleep(interval);
        }
        self.sleeper.sleep(AFTER_ACTION);
        Ok(())
    }
}
