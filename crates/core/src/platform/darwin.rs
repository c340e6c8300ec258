use anyhow::{anyhow, bail, Result};
use core_graphics::display::CGDisplay;
use core_graphics::event::*;
use core_graphics::event_source::*;
use core_graphics::geometry::*;
use core_graphics::window::*;
use image::imageops::{self, FilterType};

use crate::types::*;
use super::Platform;

// Win32 virtual-key numbering -> macOS kVK codes
fn mac_key_code(key: VirtualKey) -> Option<CGKeyCode> {
    const LETTERS: [u16; 26] = [
        0x00, 0x0B, 0x08, 0x02, 0x0E, 0x03, 0x05, 0x04, 0x22, 0x26, 0x28, 0x25, 0x2E,
        0x2D, 0x1F, 0x23, 0x0C, 0x0F, 0x01, 0x11, 0x20, 0x09, 0x0D, 0x07, 0x10, 0x06,
    ];
    const DIGITS: [u16; 10] = [0x1D, 0x12, 0x13, 0x14, 0x15, 0x17, 0x16, 0x1A, 0x1C, 0x19];
    const FKEYS: [u16; 12] = [
        0x7A, 0x78, 0x63, 0x76, 0x60, 0x61, 0x62, 0x64, 0x65, 0x6D, 0x67, 0x6F,
    ];

    let vk = key.0;
    let code = match vk {
        0x41..=0x5A => LETTERS[(vk - 0x41) as usize],
        0x30..=0x39 => DIGITS[(vk - 0x30) as usize],
        0x70..=0x7B => FKEYS[(vk - 0x70) as usize],
        0x08 => 0x33, // backspace
        0x09 => 0x30, // tab
        0x0D => 0x24, // return
        0x10 => 0x38, // shift
        0x11 => 0x3B, // control
        0x12 => 0x3A, // option
        0x14 => 0x39, // caps lock
        0x1B => 0x35, // escape
        0x20 => 0x31, // space
        0x21 => 0x74, // page up
        0x22 => 0x79, // page down
        0x23 => 0x77, // end
        0x24 => 0x73, // home
        0x25 => 0x7B,
        0x26 => 0x7E,
        0x27 => 0x7C,
        0x28 => 0x7D,
        0x2D => 0x72, // help sits where insert does
        0x2E => 0x75, // forward delete
        _ => return None,
    };
    Some(code)
}

/// CoreGraphics backend: HID-level `CGEvent` posting and display capture.
pub struct DarwinPlatform {
    width: i32,
    height: i32,
}

impl DarwinPlatform {
    pub fn new() -> Self {
        let bounds = CGDisplay::main().bounds();
        DarwinPlatform {
            width: bounds.size.width as i32,
            height: bounds.size.height as i32,
        }
    }

    fn source() -> Result<CGEventSource> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow!("failed to create HID event source"))
    }

    fn cursor() -> Result<CGPoint> {
        let event = CGEvent::new(Self::source()?).map_err(|_| anyhow!("failed to read cursor"))?;
        Ok(event.location())
    }
}

impl Platform for DarwinPlatform {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn capture(&self, region: ScreenRegion) -> Result<Capture> {
        let rect = CGRect::new(
            &CGPoint::new(region.left as f64, region.top as f64),
            &CGSize::new(region.width() as f64, region.height() as f64),
        );
        let image = create_image(
            rect,
            kCGWindowListOptionOnScreenOnly,
            kCGNullWindowID,
            kCGWindowImageDefault,
        )
        .ok_or_else(|| anyhow!("screen capture denied (Screen Recording permission?)"))?;

        let bpr = image.bytes_per_row();
        let (w, h) = (image.width() as u32, image.height() as u32);
        let cf_data = image.data();
        let bytes = cf_data.bytes();

        // BGRA rows, possibly padded
        let mut rgb = Capture::new(w, h);
        for (y, row) in bytes.chunks(bpr).take(h as usize).enumerate() {
            for x in 0..w as usize {
                let px = &row[x * 4..x * 4 + 4];
                rgb.put_pixel(x as u32, y as u32, image::Rgb([px[2], px[1], px[0]]));
            }
        }

        // Retina displays return 2x the point size.
        if (w, h) != (region.width(), region.height()) {
            rgb = imageops::resize(&rgb, region.width(), region.height(), FilterType::Triangle);
        }
        Ok(rgb)
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<()> {
        let event = CGEvent::new_mouse_event(
            Self::source()?,
            CGEventType::MouseMoved,
            CGPoint::new(x as f64, y as f64),
            CGMouseButton::Left,
        )
        .map_err(|_| anyhow!("failed to create move event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn button(&self, button: MouseButton, down: bool) -> Result<()> {
        let (kind, cg_button) = match (button, down) {
            (MouseButton::Left, true) => (CGEventType::LeftMouseDown, CGMouseButton::Left),
            (MouseButton::Left, false) => (CGEventType::LeftMouseUp, CGMouseButton::Left),
            (MouseButton::Right, true) => (CGEventType::RightMouseDown, CGMouseButton::Right),
            (MouseButton::Right, false) => (CGEventType::RightMouseUp, CGMouseButton::Right),
        };
        let event = CGEvent::new_mouse_event(Self::source()?, kind, Self::cursor()?, cg_button)
            .map_err(|_| anyhow!("failed to create button event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn key(&self, key: VirtualKey, down: bool) -> Result<()> {
        let Some(code) = mac_key_code(key) else {
            bail!("virtual key 0x{:02X} has no macOS equivalent", key.0);
        };
        let event = CGEvent::new_keyboard_event(Self::source()?, code, down)
            .map_err(|_| anyhow!("failed to create key event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }
}
