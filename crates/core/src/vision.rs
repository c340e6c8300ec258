//! Perception: screen regions in, match-or-not facts out.
//!
//! Misses and recognizer failures never leave this module as errors: they come
//! back as [`MatchResult::NotFound`], an empty list, or the clock sentinel.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use log::{debug, info, warn};
use regex::Regex;

use crate::ocr::TextRecognizer;
use crate::pause::PauseController;
use crate::platform::Platform;
use crate::sleep::Sleeper;
use crate::types::*;

pub const DEFAULT_TEXT_THRESHOLD: f32 = 0.6;
pub const DEFAULT_IMAGE_THRESHOLD: f32 = 0.8;
pub const DEFAULT_CLOCK_MAGNIFICATION: u32 = 2;

/// `(image, template) -> (best score, top-left of best location)`.
pub trait TemplateMatcher: Send + Sync {
    fn best_match(&self, image: &GrayImage, template: &GrayImage) -> Option<(f32, (u32, u32))>;
}

/// Normalized cross-correlation over grayscale pixels.
pub struct NccMatcher;

impl TemplateMatcher for NccMatcher {
    fn best_match(&self, image: &GrayImage, template: &GrayImage) -> Option<(f32, (u32, u32))> {
        if template.width() > image.width() || template.height() > image.height() {
            return None;
        }
        let scores = match_template(image, template, MatchTemplateMethod::CrossCorrelationNormalized);
        let extremes = find_extremes(&scores);
        extremes
            .max_value
            .is_finite()
            .then_some((extremes.max_value, extremes.max_value_location))
    }
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{1,3})\s*[:：]\s*(\d{1,2})").expect("valid clock regex"))
}

/// First fragment that reads as `minutes:seconds`.
pub fn parse_clock(fragments: &[TextFragment]) -> Option<SessionClock> {
    fragments.iter().find_map(|f| {
        let caps = clock_pattern().captures(&f.text)?;
        let minutes: u32 = caps[1].parse().ok()?;
        let seconds: u32 = caps[2].parse().ok()?;
        (seconds < 60).then(|| SessionClock {
            label: caps[0].to_string(),
            seconds: minutes * 60 + seconds,
        })
    })
}

/// Upscale `crop` by `magnification` and centre it on a black canvas padded by
/// the original crop size. Small HUD fonts recognize far better this way.
pub fn magnify_for_ocr(crop: &Capture, magnification: u32) -> Capture {
    let mag = magnification.max(1);
    let (w, h) = crop.dimensions();
    let scaled = imageops::resize(crop, w * mag, h * mag, FilterType::CatmullRom);
    let mut canvas = Capture::new(w * mag + w, h * mag + h);
    imageops::overlay(&mut canvas, &scaled, (w / 2) as i64, (h / 2) as i64);
    canvas
}

/// The perception service. One per process, shared by every phase.
pub struct Vision {
    platform: Arc<dyn Platform>,
    recognizer: Arc<dyn TextRecognizer>,
    matcher: Arc<dyn TemplateMatcher>,
    pause: Arc<PauseController>,
    sleeper: Arc<dyn Sleeper>,
    settle: Duration,
}

impl Vision {
    pub fn new(
        platform: Arc<dyn Platform>,
        recognizer: Arc<dyn TextRecognizer>,
        pause: Arc<PauseController>,
        sleeper: Arc<dyn Sleeper>,
        settle: Duration,
    ) -> Self {
        Self { platform, recognizer, matcher: Arc::new(NccMatcher), pause, sleeper, settle }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn TemplateMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Pause gate, settle delay, then capture.
    fn grab(&self, region: ScreenRegion) -> Result<Capture> {
        self.pause.wait_until_resumed();
        self.sleeper.sleep(self.settle);
        let capture = self.platform.capture(region)?;
        #[cfg(feature = "debug-capture")]
        save_debug_capture(&capture, region);
        Ok(capture)
    }

    fn recognize(&self, region: ScreenRegion) -> Result<Vec<TextFragment>> {
        let capture = self.grab(region)?;
        self.recognizer.recognize(&capture)
    }

    /// First fragment containing `label` with confidence ≥ `threshold`,
    /// centroid in screen space.
    pub fn find_text(&self, label: &str, region: ScreenRegion, threshold: f32) -> MatchResult {
        let fragments = match self.recognize(region) {
            Ok(f) => f,
            Err(e) => {
                warn!(target: "vision", "text search for {:?} failed: {:#}", label, e);
                return MatchResult::NotFound;
            }
        };

        let hit = fragments
            .iter()
            .find(|f| f.text.contains(label) && f.confidence >= threshold);
        match hit {
            Some(f) => {
                let (cx, cy) = f.centroid();
                let (x, y) = (region.left + cx.round() as i32, region.top + cy.round() as i32);
                info!(target: "vision", "found {:?} at ({}, {}), confidence {:.2}", label, x, y, f.confidence);
                MatchResult::Found { x, y, confidence: f.confidence }
            }
            None => {
                info!(target: "vision", "{:?} not found in {:?}", label, region);
                MatchResult::NotFound
            }
        }
    }

    /// Best template match with score ≥ `threshold`; result is the template centre.
    pub fn find_image(&self, template_path: &Path, region: ScreenRegion, threshold: f32) -> MatchResult {
        match self.try_find_image(template_path, region, threshold) {
            Ok(result) => result,
            Err(e) => {
                warn!(target: "vision", "image search for {} failed: {:#}", template_path.display(), e);
                MatchResult::NotFound
            }
        }
    }

    fn try_find_image(&self, template_path: &Path, region: ScreenRegion, threshold: f32) -> Result<MatchResult> {
        let template = image::open(template_path)
            .map_err(|e| anyhow!("cannot read template: {}", e))?
            .to_luma8();
        let capture = self.grab(region)?;
        let gray = imageops::grayscale(&capture);

        let Some((score, (mx, my))) = self.matcher.best_match(&gray, &template) else {
            info!(target: "vision", "{} not found (no score)", template_path.display());
            return Ok(MatchResult::NotFound);
        };
        if score < threshold {
            info!(target: "vision", "{} not found (best {:.2})", template_path.display(), score);
            return Ok(MatchResult::NotFound);
        }
        let x = region.left + (mx + template.width() / 2) as i32;
        let y = region.top + (my + template.height() / 2) as i32;
        info!(target: "vision", "found {} at ({}, {}), score {:.2}", template_path.display(), x, y, score);
        Ok(MatchResult::Found { x, y, confidence: score })
    }

    /// Read the in-game `MM:SS` timer. Falls back to [`SessionClock::fallback`]
    /// on any failure, so an unreadable clock reads as one minute elapsed.
    pub fn read_session_clock(&self, region: ScreenRegion, magnification: u32) -> SessionClock {
        let fragments = self
            .grab(region)
            .and_then(|crop| self.recognizer.recognize(&magnify_for_ocr(&crop, magnification)));
        let clock = match fragments {
            Ok(f) => parse_clock(&f),
            Err(e) => {
                warn!(target: "vision", "clock capture failed: {:#}", e);
                None
            }
        };
        match clock {
            Some(c) => {
                debug!(target: "vision", "session clock {} ({}s)", c.label, c.seconds);
                c
            }
            None => {
                info!(target: "vision", "session clock unreadable, assuming {}s", SessionClock::FALLBACK_SECONDS);
                SessionClock::fallback()
            }
        }
    }

    /// Every fragment in `region`, centroid in screen space.
    pub fn list_matches(&self, region: ScreenRegion) -> Vec<TextMatch> {
        let fragments = match self.recognize(region) {
            Ok(f) => f,
            Err(e) => {
                warn!(target: "vision", "listing {:?} failed: {:#}", region, e);
                return Vec::new();
            }
        };
        fragments
            .into_iter()
            .map(|f| {
                let (cx, cy) = f.centroid();
                TextMatch {
                    x: region.left + cx.round() as i32,
                    y: region.top + cy.round() as i32,
                    text: f.text,
                    confidence: f.confidence,
                }
            })
            .collect()
    }
}

#[cfg(feature = "debug-capture")]
fn save_debug_capture(capture: &Capture, region: ScreenRegion) {
    let Some(dir) = crate::logger::log_dir() else { return };
    let dir = dir.join("captures");
    std::fs::create_dir_all(&dir).ok();
    let name = format!(
        "{}-{}_{}_{}_{}.png",
        chrono::Local::now().format("%H%M%S%3f"),
        region.left,
        region.top,
        region.right,
        region.bottom
    );
    if let Err(e) = capture.save(dir.join(name)) {
        debug!(target: "vision", "debug capture not saved: {}", e);
    }
}
