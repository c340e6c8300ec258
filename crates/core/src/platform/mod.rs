pub mod stub;
pub mod hotkey;

#[cfg(target_os = "macos")]
pub mod darwin;

#[cfg(target_os = "windows")]
pub mod win32;

use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::types::*;

/// OS boundary: screen geometry, region capture and raw input injection.
///
/// Implementations inject at the lowest practical layer so the game sees the
/// events as hardware input. No method checks pause state or bounds; that is
/// the job of [`crate::input::Input`] and [`crate::vision::Vision`].
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;
    fn screen_size(&self) -> (i32, i32);
    fn capture(&self, region: ScreenRegion) -> Result<Capture>;
    fn move_pointer(&self, x: i32, y: i32) -> Result<()>;
    fn button(&self, button: MouseButton, down: bool) -> Result<()>;
    fn key(&self, key: VirtualKey, down: bool) -> Result<()>;
}

/// Map a pixel to `SendInput` absolute units, where 0..=65535 spans
/// pixels 0..=extent-1 of the primary screen.
#[cfg(any(target_os = "windows", test))]
pub(crate) fn normalize_absolute(pixel: i32, extent: i32) -> i32 {
    let last = (extent as i64 - 1).max(1);
    ((pixel as i64 * 65535 + last / 2) / last) as i32
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Arc<dyn Platform> {
    let platform = select(force_stub);
    let (w, h) = platform.screen_size();
    info!(target: "platform", "{} platform, screen {}x{}", platform.name(), w, h);
    platform
}

fn select(force_stub: bool) -> Arc<dyn Platform> {
    if force_stub {
        Arc::new(stub::StubPlatform::default())
    } else {
        native()
    }
}

#[cfg(target_os = "windows")]
fn native() -> Arc<dyn Platform> {
    Arc::new(win32::WindowsPlatform::new())
}

#[cfg(target_os = "macos")]
fn native() -> Arc<dyn Platform> {
    Arc::new(darwin::DarwinPlatform::new())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn native() -> Arc<dyn Platform> {
    Arc::new(stub::StubPlatform::default())
}
