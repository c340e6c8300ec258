//! Game phases. Each is one bounded polling loop over perception and input.

pub mod archive;
pub mod collect;
pub mod difficulty;
pub mod items;
pub mod restart;
pub mod skills;
pub mod start;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::input::{Input, CLICK_INTERVAL};
use crate::layout::{GameLayout, TextTarget};
use crate::ocr::TextRecognizer;
use crate::pause::PauseController;
use crate::platform::Platform;
use crate::settings::{AutomationConfig, Timings};
use crate::sleep::Sleeper;
use crate::types::*;
use crate::vision::{Vision, DEFAULT_TEXT_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum PhaseKind {
    Difficulty,
    Start,
    Collect,
    Archive,
    Restart,
}

impl PhaseKind {
    pub fn name(self) -> &'static str {
        match self {
            PhaseKind::Difficulty => "difficulty",
            PhaseKind::Start => "start",
            PhaseKind::Collect => "collect",
            PhaseKind::Archive => "archive",
            PhaseKind::Restart => "restart",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhaseKind {
    type Err = ConfigError;

    /// English names, or the labels the operator UI used (`难度`, `开局`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "difficulty" | "难度" => Ok(PhaseKind::Difficulty),
            "start" | "开局" => Ok(PhaseKind::Start),
            "collect" | "收起" => Ok(PhaseKind::Collect),
            "archive" | "存档" => Ok(PhaseKind::Archive),
            "restart" | "重开" => Ok(PhaseKind::Restart),
            _ => Err(ConfigError::UnknownPhase(s.to_string())),
        }
    }
}

impl TryFrom<String> for PhaseKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    /// The phase observed its success condition (collect: the session ended).
    Succeeded,
}

pub trait Phase {
    fn kind(&self) -> PhaseKind;
    fn run(&self, ctx: &Context) -> Result<PhaseOutcome>;
}

/// One handler per phase kind.
pub fn standard() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(difficulty::DifficultyPhase),
        Box::new(start::StartPhase),
        Box::new(collect::CollectPhase),
        Box::new(archive::ArchivePhase),
        Box::new(restart::RestartPhase),
    ]
}

/// Everything a phase may touch, built once and shared by reference.
pub struct Context {
    pub vision: Vision,
    pub input: Input,
    pub pause: Arc<PauseController>,
    pub sleeper: Arc<dyn Sleeper>,
    pub layout: GameLayout,
    pub timings: Timings,
    pub difficulty: u32,
    pub use_resources: bool,
}

impl Context {
    pub fn new(
        config: &AutomationConfig,
        platform: Arc<dyn Platform>,
        recognizer: Arc<dyn TextRecognizer>,
        pause: Arc<PauseController>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let vision = Vision::new(
            Arc::clone(&platform),
            recognizer,
            Arc::clone(&pause),
            Arc::clone(&sleeper),
            config.timings.settle(),
        );
        let input = Input::new(platform, Arc::clone(&pause), Arc::clone(&sleeper));
        Self {
            vision,
            input,
            pause,
            sleeper,
            layout: config.layout.clone(),
            timings: config.timings.clone(),
            difficulty: config.difficulty,
            use_resources: config.use_resources,
        }
    }

    pub fn clock(&self) -> SessionClock {
        self.vision
            .read_session_clock(self.layout.clock, self.layout.clock_magnification)
    }

    pub fn find(&self, target: &TextTarget) -> MatchResult {
        self.vision
            .find_text(&target.label, target.region, DEFAULT_TEXT_THRESHOLD)
    }

    /// Click a hit the number of times its target asks for. Misses are skipped.
    pub fn click_hit(&self, target: &TextTarget, hit: MatchResult) -> Result<()> {
        let (x, y) = hit.point();
        self.input.move_and_click(x, y, target.clicks, CLICK_INTERVAL)?;
        Ok(())
    }
}
