//! Test doubles: a recording clock and a scripted screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::ocr::TextRecognizer;
use crate::pause::PauseController;
use crate::phases::Context;
use crate::platform::Platform;
use crate::settings::AutomationConfig;
use crate::sleep::Sleeper;
use crate::types::*;

/// Sleeps run forever in a broken polling loop; fail the test instead.
const SLEEP_LIMIT: usize = 200_000;

type SleepHook = Box<dyn FnMut(usize, Duration) + Send>;

#[derive(Default)]
pub struct FakeSleeper {
    slept: Mutex<Vec<Duration>>,
    hook: Mutex<Option<SleepHook>>,
}

impl FakeSleeper {
    /// Run `f(n, duration)` after the n-th sleep (1-based) is recorded.
    pub fn on_sleep(&self, f: impl FnMut(usize, Duration) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(f));
    }

    pub fn calls(&self) -> usize {
        self.slept.lock().unwrap().len()
    }

    pub fn total(&self) -> Duration {
        self.slept.lock().unwrap().iter().sum()
    }

    pub fn history(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Sleeper for FakeSleeper {
    fn sleep(&self, duration: Duration) {
        let n = {
            let mut slept = self.slept.lock().unwrap();
            slept.push(duration);
            slept.len()
        };
        assert!(n < SLEEP_LIMIT, "polling loop never terminated");
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook(n, duration);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(i32, i32),
    Down(MouseButton),
    Up(MouseButton),
    KeyDown(VirtualKey),
    KeyUp(VirtualKey),
}

type Script = Box<dyn FnMut(ScreenRegion) -> Vec<TextFragment> + Send>;

/// Platform and recognizer in one: records input, answers OCR queries from a
/// script keyed on the last captured region.
pub struct FakeScreen {
    events: Mutex<Vec<InputEvent>>,
    captures: Mutex<Vec<ScreenRegion>>,
    recognized: Mutex<Vec<(u32, u32)>>,
    script: Mutex<Script>,
    frame: Mutex<Option<Capture>>,
    fail_recognizer: AtomicBool,
    fail_input: AtomicBool,
}

impl FakeScreen {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            captures: Mutex::new(Vec::new()),
            recognized: Mutex::new(Vec::new()),
            script: Mutex::new(Box::new(|_| Vec::new())),
            frame: Mutex::new(None),
            fail_recognizer: AtomicBool::new(false),
            fail_input: AtomicBool::new(false),
        })
    }

    pub fn script(&self, f: impl FnMut(ScreenRegion) -> Vec<TextFragment> + Send + 'static) {
        *self.script.lock().unwrap() = Box::new(f);
    }

    /// Image returned for every capture instead of a black frame.
    pub fn set_frame(&self, frame: Capture) {
        *self.frame.lock().unwrap() = Some(frame);
    }

    pub fn fail_recognizer(&self, fail: bool) {
        self.fail_recognizer.store(fail, Ordering::SeqCst);
    }

    pub fn fail_input(&self, fail: bool) {
        self.fail_input.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn captures(&self) -> Vec<ScreenRegion> {
        self.captures.lock().unwrap().clone()
    }

    pub fn recognized_sizes(&self) -> Vec<(u32, u32)> {
        self.recognized.lock().unwrap().clone()
    }

    /// Pointer position at each press of `button`.
    pub fn presses(&self, button: MouseButton) -> Vec<(i32, i32)> {
        let mut at = (0, 0);
        let mut out = Vec::new();
        for e in self.events() {
            match e {
                InputEvent::Move(x, y) => at = (x, y),
                InputEvent::Down(b) if b == button => out.push(at),
                _ => {}
            }
        }
        out
    }

    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.presses(MouseButton::Left)
    }

    pub fn keys(&self) -> Vec<VirtualKey> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::KeyDown(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: InputEvent) -> Result<()> {
        if self.fail_input.load(Ordering::SeqCst) {
            bail!("injection refused");
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl Platform for FakeScreen {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }

    fn capture(&self, region: ScreenRegion) -> Result<Capture> {
        self.captures.lock().unwrap().push(region);
        Ok(self
            .frame
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Capture::new(region.width(), region.height())))
    }

    fn move_pointer(&self, x: i32, y: i32) -> Result<()> {
        self.record(InputEvent::Move(x, y))
    }

    fn button(&self, button: MouseButton, down: bool) -> Result<()> {
        self.record(if down { InputEvent::Down(button) } else { InputEvent::Up(button) })
    }

    fn key(&self, key: VirtualKey, down: bool) -> Result<()> {
        self.record(if down { InputEvent::KeyDown(key) } else { InputEvent::KeyUp(key) })
    }
}

impl TextRecognizer for FakeScreen {
    fn recognize(&self, image: &Capture) -> Result<Vec<TextFragment>> {
        if self.fail_recognizer.load(Ordering::SeqCst) {
            bail!("recognizer crashed");
        }
        self.recognized.lock().unwrap().push(image.dimensions());
        let Some(region) = self.captures.lock().unwrap().last().copied() else {
            return Ok(Vec::new());
        };
        let mut script = self.script.lock().unwrap();
        Ok((*script)(region))
    }
}

/// Axis-aligned fragment spanning `from..to` in capture-local pixels.
pub fn frag(text: &str, confidence: f32, from: (f32, f32), to: (f32, f32)) -> TextFragment {
    TextFragment {
        quad: [from, (to.0, from.1), to, (from.0, to.1)],
        text: text.to_string(),
        confidence,
    }
}

/// Small fragment in the capture corner, for scripts that only care about presence.
pub fn seen(text: &str) -> TextFragment {
    frag(text, 0.9, (0.0, 0.0), (10.0, 10.0))
}

/// Phase context wired to `screen` with a fake clock and default configuration.
pub fn context(screen: &Arc<FakeScreen>) -> (Context, Arc<FakeSleeper>) {
    context_with(screen, &AutomationConfig::default())
}

pub fn context_with(screen: &Arc<FakeScreen>, config: &AutomationConfig) -> (Context, Arc<FakeSleeper>) {
    let sleeper = Arc::new(FakeSleeper::default());
    let pause = Arc::new(PauseController::new(
        sleeper.clone(),
        config.timings.poll_interval(),
        config.timings.heartbeat_every,
    ));
    let ctx = Context::new(config, screen.clone(), screen.clone(), pause, sleeper.clone());
    (ctx, sleeper)
}
