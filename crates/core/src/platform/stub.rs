use anyhow::Result;
use log::debug;

use crate::types::*;
use super::Platform;

/// Dry-run platform: logs every call, captures are black frames.
pub struct StubPlatform {
    width: i32,
    height: i32,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

impl Platform for StubPlatform {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn capture(&self, region: ScreenRegion) -> Result<Capture> {
        debug!(target: "stub", "capture({:?})", region);
        Ok(Capture::new(region.width(), region.height()))
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<()> {
        debug!(target: "stub", "move_pointer({}, {})", x, y);
        Ok(())
    }

    fn button(&self, button: MouseButton, down: bool) -> Result<()> {
        debug!(target: "stub", "button({:?}, {})", button, if down { "down" } else { "up" });
        Ok(())
    }

    fn key(&self, key: VirtualKey, down: bool) -> Result<()> {
        debug!(target: "stub", "key(0x{:02X}, {})", key.0, if down { "down" } else { "up" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_matches_region_size() {
        let p = StubPlatform::default();
        let cap = p.capture(ScreenRegion::from_ltrb(897, 0, 1015, 27)).unwrap();
        assert_eq!(cap.dimensions(), (118, 27));
        assert_eq!(p.screen_size(), (1920, 1080));
    }
}
