use std::mem::size_of;

use anyhow::{bail, Result};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use crate::types::*;
use super::Platform;

/// Win32 backend: `SendInput` for injection, GDI `BitBlt` for capture.
pub struct WindowsPlatform {
    width: i32,
    height: i32,
}

impl WindowsPlatform {
    pub fn new() -> Self {
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        Self { width: width.max(1), height: height.max(1) }
    }

    fn send(&self, input: INPUT) -> Result<()> {
        let sent = unsafe { SendInput(&[input], size_of::<INPUT>() as i32) };
        if sent != 1 {
            bail!("SendInput rejected the event (blocked by UIPI?)");
        }
        Ok(())
    }

    fn mouse(&self, dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> Result<()> {
        self.send(INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT { dx, dy, mouseData: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
            },
        })
    }
}

impl Platform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn screen_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn capture(&self, region: ScreenRegion) -> Result<Capture> {
        let (w, h) = (region.width() as i32, region.height() as i32);
        let mut bgra = vec![0u8; (w * h * 4) as usize];

        unsafe {
            let screen_dc = GetDC(HWND::default());
            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, w, h);
            let previous = SelectObject(mem_dc, HGDIOBJ(bitmap.0));

            let blit = BitBlt(mem_dc, 0, 0, w, h, screen_dc, region.left, region.top, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    biHeight: -h, // top-down rows
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let lines = GetDIBits(
                mem_dc,
                bitmap,
                0,
                h as u32,
                Some(bgra.as_mut_ptr().cast()),
                &mut info,
                DIB_RGB_COLORS,
            );

            SelectObject(mem_dc, previous);
            let _ = DeleteObject(HGDIOBJ(bitmap.0));
            let _ = DeleteDC(mem_dc);
            ReleaseDC(HWND::default(), screen_dc);

            blit?;
            if lines != h {
                bail!("GetDIBits copied {} of {} rows", lines, h);
            }
        }

        let rgb = bgra
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect::<Vec<u8>>();
        Capture::from_raw(w as u32, h as u32, rgb)
            .ok_or_else(|| anyhow::anyhow!("capture buffer size mismatch"))
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<()> {
        let nx = super::normalize_absolute(x, self.width);
        let ny = super::normalize_absolute(y, self.height);
        self.mouse(nx, ny, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)
    }

    fn button(&self, button: MouseButton, down: bool) -> Result<()> {
        let flags = match (button, down) {
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
        };
        self.mouse(0, 0, flags)
    }

    fn key(&self, key: VirtualKey, down: bool) -> Result<()> {
        let flags = if down { KEYBD_EVENT_FLAGS(0) } else { KEYEVENTF_KEYUP };
        self.send(INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT { wVk: VIRTUAL_KEY(key.0), wScan: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
            },
        })
    }
}
