use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::layout::GameLayout;
use crate::phases::PhaseKind;

/// Every interval of the polling loops, in the units the operator tunes them in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub poll_interval_ms: u64,
    pub heartbeat_every: u32,
    pub settle_ms: u64,
    pub tick_ms: u64,
    pub start_retry_ms: u64,
    pub restart_retry_ms: u64,
    pub difficulty_retry_ms: u64,
    pub collect_timeout_secs: u32,
    pub relocation_threshold_secs: u32,
    pub reroll_budget: u32,
    pub jitter: f64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            heartbeat_every: 10,
            settle_ms: 500,
            tick_ms: 5000,
            start_retry_ms: 3000,
            restart_retry_ms: 5000,
            difficulty_retry_ms: 5000,
            collect_timeout_secs: 180,
            relocation_threshold_secs: 900,
            reroll_budget: 8,
            jitter: 0.0,
        }
    }
}

impl Timings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn start_retry(&self) -> Duration {
        Duration::from_millis(self.start_retry_ms)
    }

    pub fn restart_retry(&self) -> Duration {
        Duration::from_millis(self.restart_retry_ms)
    }

    pub fn difficulty_retry(&self) -> Duration {
        Duration::from_millis(self.difficulty_retry_ms)
    }
}

/// External OCR program. `None` runs without text recognition.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Longest wait for one answer before the program is restarted.
    pub timeout_ms: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { command: None, args: Vec::new(), timeout_ms: 10_000 }
    }
}

impl OcrSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Unknown names are logged and read as `None`, which runs the whole
/// sequence, so one typo does not discard the rest of the file.
fn lenient_phase<'de, D>(de: D) -> Result<Option<PhaseKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(de)?;
    Ok(name.and_then(|n| match n.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!(target: "settings", "starting_phase: {}, running the full sequence", e);
            None
        }
    }))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub phases: Vec<PhaseKind>,
    #[serde(deserialize_with = "lenient_phase")]
    pub starting_phase: Option<PhaseKind>,
    pub difficulty: u32,
    pub use_resources: bool,
    pub start_paused: bool,
    pub cycles: Option<u64>,
    pub timings: Timings,
    pub ocr: OcrSettings,
    pub layout: GameLayout,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                PhaseKind::Difficulty,
                PhaseKind::Start,
                PhaseKind::Collect,
                PhaseKind::Archive,
                PhaseKind::Restart,
            ],
            starting_phase: Some(PhaseKind::Start),
            difficulty: 10,
            use_resources: true,
            start_paused: false,
            cycles: None,
            timings: Timings::default(),
            ocr: OcrSettings::default(),
            layout: GameLayout::default(),
        }
    }
}

impl AutomationConfig {
    /// Read `path`. A missing file yields defaults; a malformed one is
    /// reported and also yields defaults.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => {
                info!(target: "settings", "{} not found, using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(config) => {
                info!(target: "settings", "loaded {}", path.display());
                config
            }
            Err(e) => {
                warn!(target: "settings", "ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        if !(1..=25).contains(&self.difficulty) {
            return Err(ConfigError::DifficultyOutOfRange(self.difficulty));
        }
        if self.timings.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("timings.poll_interval_ms"));
        }
        if self.ocr.timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("ocr.timeout_ms"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = AutomationConfig::default();
        assert_eq!(c.phases.len(), 5);
        assert_eq!(c.starting_phase, Some(PhaseKind::Start));
        assert_eq!(c.ocr.timeout(), Duration::from_secs(10));
        assert_eq!(c.timings.reroll_budget, 8);
        assert_eq!(c.timings.poll_interval(), Duration::from_secs(1));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_original_labels() {
        let c: AutomationConfig = serde_json::from_str(
            r#"{ "phases": ["开局", "收起", "重开", "难度"], "starting_phase": "收起", "difficulty": 3 }"#,
        )
        .unwrap();
        assert_eq!(
            c.phases,
            vec![PhaseKind::Start, PhaseKind::Collect, PhaseKind::Restart, PhaseKind::Difficulty]
        );
        assert_eq!(c.starting_phase, Some(PhaseKind::Collect));
        assert_eq!(c.difficulty, 3);
        assert!(c.use_resources);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let err = serde_json::from_str::<AutomationConfig>(r#"{ "phases": ["start", "lunch"] }"#).unwrap_err();
        assert!(err.to_string().contains("lunch"));
    }

    #[test]
    fn test_validate() {
        let mut c = AutomationConfig { phases: Vec::new(), ..Default::default() };
        assert_eq!(c.validate(), Err(ConfigError::EmptySequence));

        c.phases = vec![PhaseKind::Start];
        c.difficulty = 26;
        assert_eq!(c.validate(), Err(ConfigError::DifficultyOutOfRange(26)));
        c.difficulty = 0;
        assert_eq!(c.validate(), Err(ConfigError::DifficultyOutOfRange(0)));

        c.difficulty = 25;
        c.timings.poll_interval_ms = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroInterval("timings.poll_interval_ms")));

        c.timings.poll_interval_ms = 1000;
        c.ocr.timeout_ms = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroInterval("ocr.timeout_ms")));

        c.ocr.timeout_ms = 500;
        c.timings.reroll_budget = 0;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let missing = std::env::temp_dir().join("ranger-no-such-settings.json");
        assert_eq!(AutomationConfig::load(&missing).difficulty, 10);

        let bad = std::env::temp_dir().join(format!("ranger-bad-settings-{}.json", std::process::id()));
        std::fs::write(&bad, "{ not json").unwrap();
        let c = AutomationConfig::load(&bad);
        std::fs::remove_file(&bad).ok();
        assert_eq!(c.phases.len(), 5);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("ranger-settings-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "cycles": 2, "use_resources": false, "ocr": { "command": "ocr-server" } }"#).unwrap();
        let c = AutomationConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(c.cycles, Some(2));
        assert!(!c.use_resources);
        assert_eq!(c.ocr.command.as_deref(), Some("ocr-server"));
        assert!(c.ocr.args.is_empty());
    }

    #[test]
    fn test_misspelled_starting_phase_keeps_other_settings() {
        let path = std::env::temp_dir().join(format!("ranger-typo-settings-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "difficulty": 3, "use_resources": false, "starting_phase": "strat", "ocr": { "command": "ocr-server" } }"#,
        )
        .unwrap();
        let c = AutomationConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(c.starting_phase, None);
        assert_eq!(c.difficulty, 3);
        assert!(!c.use_resources);
        assert_eq!(c.ocr.command.as_deref(), Some("ocr-server"));
    }
}
