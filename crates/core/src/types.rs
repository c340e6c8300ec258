use serde::{Deserialize, Deserializer};

/// Captured screen pixels (RGB).
pub type Capture = image::RgbImage;

/// Absolute screen-pixel rectangle. Always non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRegion {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRegion {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Option<Self> {
        (left < right && top < bottom).then_some(Self { left, top, right, bottom })
    }

    /// Build a region from literal layout coordinates. Panics on an empty rectangle.
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        assert!(left < right && top < bottom, "empty screen region");
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }
}

impl<'de> Deserialize<'de> for ScreenRegion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [l, t, r, b] = <[i32; 4]>::deserialize(deserializer)?;
        ScreenRegion::new(l, t, r, b).ok_or_else(|| {
            serde::de::Error::custom(format!("empty region [{}, {}, {}, {}]", l, t, r, b))
        })
    }
}

/// Absolute screen point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y] = <[i32; 2]>::deserialize(deserializer)?;
        Ok(Point { x, y })
    }
}

/// Outcome of one perception query. Never cached: the screen moves on between polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchResult {
    Found { x: i32, y: i32, confidence: f32 },
    NotFound,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found { .. })
    }

    /// Match centre, or `(-1, -1)` on a miss (the input layer skips that point).
    pub fn point(&self) -> (i32, i32) {
        match *self {
            MatchResult::Found { x, y, .. } => (x, y),
            MatchResult::NotFound => (-1, -1),
        }
    }

    pub fn confidence(&self) -> f32 {
        match *self {
            MatchResult::Found { confidence, .. } => confidence,
            MatchResult::NotFound => 0.0,
        }
    }
}

/// In-game elapsed time as read off the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    pub label: String,
    pub seconds: u32,
}

impl SessionClock {
    pub const FALLBACK_SECONDS: u32 = 60;

    /// Reading used whenever the on-screen timer cannot be parsed.
    pub fn fallback() -> Self {
        Self { label: "0".into(), seconds: Self::FALLBACK_SECONDS }
    }
}

/// One recognizer detection, in capture-local pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub quad: [(f32, f32); 4],
    pub text: String,
    pub confidence: f32,
}

impl TextFragment {
    pub fn centroid(&self) -> (f32, f32) {
        let (sx, sy) = self
            .quad
            .iter()
            .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
        (sx / 4.0, sy / 4.0)
    }
}

/// A detection translated into screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub confidence: f32,
}

/// Platform-neutral key code (Win32 virtual-key numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualKey(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}
