use std::sync::Arc;
use std::thread::JoinHandle;

use log::info;

use crate::pause::PauseController;

/// Handle to the background thread that toggles pause on F11.
pub struct HotkeyObserver {
    handle: Option<JoinHandle<()>>,
    stopper: Option<Box<dyn FnOnce() + Send>>,
}

impl HotkeyObserver {
    /// Observer with no thread behind it (unsupported platform, stub runs).
    pub fn inert() -> Self {
        Self { handle: None, stopper: None }
    }

    pub(crate) fn from_parts(handle: Option<JoinHandle<()>>, stopper: Box<dyn FnOnce() + Send>) -> Self {
        Self { handle, stopper: Some(stopper) }
    }

    pub fn is_running(&self) -> bool {
        self.stopper.is_some()
    }

    /// Ask the observer thread to exit and wait for it. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stopper.take() {
            info!(target: "hotkey", "stopping hotkey observer");
            stop();
        }
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for HotkeyObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// macOS turns an event tap off when its callback is slow or on user input
/// and reports it through these pseudo event types.
#[cfg(any(target_os = "macos", test))]
const TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
#[cfg(any(target_os = "macos", test))]
const TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;

#[cfg(any(target_os = "macos", test))]
fn tap_disabled(event_type: u32) -> bool {
    event_type == TAP_DISABLED_BY_TIMEOUT || event_type == TAP_DISABLED_BY_USER_INPUT
}

/// Start a background thread that listens for the global hotkey F11 and
/// toggles `pause` each time it is pressed.
#[cfg(target_os = "macos")]
pub fn start_pause_hotkey(pause: Arc<PauseController>) -> HotkeyObserver {
    use std::ffi::c_void;
    use std::sync::mpsc;

    use core_foundation::base::TCFType;
    use core_foundation::runloop::{
        kCFRunLoopCommonModes, CFRunLoop, CFRunLoopRef, CFRunLoopSource, CFRunLoopSourceRef, CFRunLoopStop,
    };

    // CGEventTap FFI types and functions
    type CGEventTapProxy = *mut c_void;
    type CGEventRef = *mut c_void;
    type CFMachPortRef = *mut c_void;
    type CGEventMask = u64;
    type CGEventType = u32;

    type CGEventTapCallBack = unsafe extern "C" fn(
        CGEventTapProxy,
        CGEventType,
        CGEventRef,
        *mut c_void,
    ) -> CGEventRef;

    const K_CG_HID_EVENT_TAP: u32 = 0;
    const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
    const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;
    const CG_EVENT_KEY_DOWN: u32 = 10;
    const K_CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;
    const K_CG_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
    const KEYCODE_F11: i64 = 103;

    extern "C" {
        fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: CGEventMask,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;
        fn CFMachPortCreateRunLoopSource(
            allocator: *const c_void,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        fn CFMachPortInvalidate(port: CFMachPortRef);
        fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
        fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    }

    /// Callback state, owned by the tap thread.
    struct TapState {
        pause: Arc<PauseController>,
        tap: CFMachPortRef,
    }

    unsafe extern "C" fn hotkey_callback(
        _proxy: CGEventTapProxy,
        event_type: CGEventType,
        event: CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventRef {
        unsafe {
            let state = &*(user_info as *const TapState);
            if tap_disabled(event_type) {
                if !state.tap.is_null() {
                    log::warn!(target: "hotkey", "event tap disabled by the system, re-enabling");
                    CGEventTapEnable(state.tap, true);
                }
                return event;
            }
            if event_type != CG_EVENT_KEY_DOWN {
                return event;
            }
            let keycode = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE);
            let repeat = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_AUTOREPEAT);
            if keycode == KEYCODE_F11 && repeat == 0 {
                state.pause.toggle();
            }
            event
        }
    }

    let (tx, rx) = mpsc::channel::<usize>();

    let handle = std::thread::spawn(move || unsafe {
        let mask: CGEventMask = 1 << CG_EVENT_KEY_DOWN;
        let state = Box::into_raw(Box::new(TapState { pause, tap: std::ptr::null_mut() }));

        let tap = CGEventTapCreate(
            K_CG_HID_EVENT_TAP,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
            mask,
            hotkey_callback,
            state as *mut c_void,
        );

        if tap.is_null() {
            log::error!(
                target: "hotkey",
                "failed to create event tap for F11, grant Accessibility permission to your terminal"
            );
            drop(Box::from_raw(state));
            return;
        }
        (*state).tap = tap;

        let source = CFRunLoopSource::wrap_under_create_rule(CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0));
        let run_loop = CFRunLoop::get_current();
        run_loop.add_source(&source, kCFRunLoopCommonModes);
        CGEventTapEnable(tap, true);
        tx.send(run_loop.as_concrete_TypeRef() as usize).ok();
        info!(target: "hotkey", "global hotkey F11 registered");

        CFRunLoop::run_current(); // until CFRunLoopStop

        CFMachPortInvalidate(tap);
        drop(Box::from_raw(state));
    });

    match rx.recv() {
        Ok(run_loop) => HotkeyObserver::from_parts(
            Some(handle),
            Box::new(move || unsafe { CFRunLoopStop(run_loop as CFRunLoopRef) }),
        ),
        Err(_) => {
            handle.join().ok();
            HotkeyObserver::inert()
        }
    }
}

/// Start a background thread that listens for the global hotkey F11 (Windows)
/// and toggles `pause` each time it is pressed, beeping high on pause and low
/// on resume.
#[cfg(target_os = "windows")]
pub fn start_pause_hotkey(pause: Arc<PauseController>) -> HotkeyObserver {
    use std::ffi::c_void;
    use std::sync::mpsc;

    type HWND = *mut c_void;
    type BOOL = i32;
    type UINT = u32;
    type WPARAM = usize;
    type LPARAM = isize;
    type DWORD = u32;
    type LONG = i32;

    #[repr(C)]
    struct POINT {
        x: LONG,
        y: LONG,
    }

    #[repr(C)]
    struct MSG {
        hwnd: HWND,
        message: UINT,
        w_param: WPARAM,
        l_param: LPARAM,
        time: DWORD,
        pt: POINT,
    }

    const MOD_NOREPEAT: u32 = 0x4000;
    const VK_F11: u32 = 0x7A;
    const WM_HOTKEY: u32 = 0x0312;
    const WM_QUIT: u32 = 0x0012;
    const HOTKEY_ID: i32 = 1;

    extern "system" {
        fn RegisterHotKey(hwnd: HWND, id: i32, fs_modifiers: UINT, vk: UINT) -> BOOL;
        fn UnregisterHotKey(hwnd: HWND, id: i32) -> BOOL;
        fn GetMessageW(
            msg: *mut MSG,
            hwnd: HWND,
            msg_filter_min: UINT,
            msg_filter_max: UINT,
        ) -> BOOL;
        fn PostThreadMessageW(thread_id: DWORD, msg: UINT, w_param: WPARAM, l_param: LPARAM) -> BOOL;
        fn GetCurrentThreadId() -> DWORD;
        fn Beep(freq: DWORD, duration: DWORD) -> BOOL;
    }

    let (tx, rx) = mpsc::channel::<Option<u32>>();

    let handle = std::thread::spawn(move || unsafe {
        let ok = RegisterHotKey(std::ptr::null_mut(), HOTKEY_ID, MOD_NOREPEAT, VK_F11);
        if ok == 0 {
            log::error!(
                target: "hotkey",
                "failed to register global hotkey F11, another application may have claimed it"
            );
            tx.send(None).ok();
            return;
        }
        tx.send(Some(GetCurrentThreadId())).ok();
        info!(target: "hotkey", "global hotkey F11 registered");

        let mut msg: MSG = std::mem::zeroed();
        // GetMessageW blocks until a message arrives; returns 0 on WM_QUIT
        while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
            if msg.message == WM_HOTKEY && msg.w_param == HOTKEY_ID as usize {
                let paused = pause.toggle();
                Beep(if paused { 2000 } else { 1000 }, 300);
            }
        }
        UnregisterHotKey(std::ptr::null_mut(), HOTKEY_ID);
    });

    match rx.recv() {
        Ok(Some(thread_id)) => HotkeyObserver::from_parts(
            Some(handle),
            Box::new(move || unsafe {
                PostThreadMessageW(thread_id, WM_QUIT, 0, 0);
            }),
        ),
        _ => {
            handle.join().ok();
            HotkeyObserver::inert()
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn start_pause_hotkey(_pause: Arc<PauseController>) -> HotkeyObserver {
    log::warn!(target: "hotkey", "global hotkeys not supported on this platform, pause is unavailable");
    HotkeyObserver::inert()
}
