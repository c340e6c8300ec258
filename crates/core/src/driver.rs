//! Sequential phase runner with resume offset and wrap-around.

use anyhow::{anyhow, Context as _, Result};
use log::{error, info};

use crate::error::ConfigError;
use crate::phases::{Context, Phase, PhaseKind, PhaseOutcome};
use crate::platform::hotkey::HotkeyObserver;
use crate::settings::AutomationConfig;

pub struct Driver {
    config: AutomationConfig,
    ctx: Context,
    phases: Vec<Box<dyn Phase>>,
    observer: HotkeyObserver,
}

impl Driver {
    /// Validate `config` and take ownership of everything the run needs.
    /// The observer is stopped when the driver finishes or is dropped.
    pub fn new(
        config: AutomationConfig,
        ctx: Context,
        phases: Vec<Box<dyn Phase>>,
        observer: HotkeyObserver,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some(missing) = config
            .phases
            .iter()
            .find(|k| !phases.iter().any(|p| p.kind() == **k))
        {
            return Err(ConfigError::UnknownPhase(missing.to_string()));
        }
        Ok(Self { config, ctx, phases, observer })
    }

    fn handler(&self, kind: PhaseKind) -> Result<&dyn Phase> {
        self.phases
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
            .ok_or_else(|| anyhow!("no handler for {} phase", kind))
    }

    /// Index the first cycle starts from. Unknown starting phases run everything.
    fn first_offset(&self) -> usize {
        let Some(start) = self.config.starting_phase else {
            info!(target: "driver", "no starting phase, running all phases");
            return 0;
        };
        match self.config.phases.iter().position(|k| *k == start) {
            Some(i) => i,
            None => {
                error!(target: "driver", "starting phase {} is not in the sequence, running all phases", start);
                0
            }
        }
    }

    /// Run until the cycle limit is reached or a phase fails.
    pub fn run(mut self) -> Result<()> {
        let result = self.run_cycles();
        self.observer.stop();
        result
    }

    fn run_cycles(&self) -> Result<()> {
        if self.config.start_paused {
            if !self.ctx.pause.is_paused() {
                self.ctx.pause.toggle();
            }
            info!(target: "driver", "waiting for F11 to begin");
            self.ctx.pause.wait_until_resumed();
        }

        let sequence = &self.config.phases;
        let mut offset = self.first_offset();
        let mut cycle: u64 = 0;

        while self.config.cycles.map_or(true, |limit| cycle < limit) {
            cycle += 1;
            // A resumed first cycle that skips collect may still archive.
            let mut session_ended = sequence[..offset].contains(&PhaseKind::Collect);

            for &kind in &sequence[offset..] {
                if kind == PhaseKind::Archive && !session_ended {
                    info!(target: "driver", "cycle {}: skipping archive, session did not end", cycle);
                    continue;
                }
                info!(target: "driver", "cycle {}: {} phase", cycle, kind);
                let outcome = self
                    .handler(kind)?
                    .run(&self.ctx)
                    .with_context(|| format!("{} phase failed", kind))?;
                if kind == PhaseKind::Collect {
                    session_ended = outcome == PhaseOutcome::Succeeded;
                }
            }
            offset = 0;
        }
        info!(target: "driver", "finished {} cycle(s)", cycle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, FakeScreen};
    use anyhow::bail;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use crate::phases::PhaseKind::*;

    type Trace = Arc<Mutex<Vec<PhaseKind>>>;

    struct Scripted {
        kind: PhaseKind,
        trace: Trace,
        outcome: PhaseOutcome,
        fail: bool,
    }

    impl Phase for Scripted {
        fn kind(&self) -> PhaseKind {
            self.kind
        }

        fn run(&self, _ctx: &Context) -> Result<PhaseOutcome> {
            self.trace.lock().unwrap().push(self.kind);
            if self.fail {
                bail!("scripted failure");
            }
            Ok(self.outcome)
        }
    }

    fn scripted(trace: &Trace, collect: PhaseOutcome, failing: Option<PhaseKind>) -> Vec<Box<dyn Phase>> {
        [Difficulty, Start, Collect, Archive, Restart]
            .into_iter()
            .map(|kind| {
                Box::new(Scripted {
                    kind,
                    trace: Arc::clone(trace),
                    outcome: if kind == Collect { collect } else { PhaseOutcome::Completed },
                    fail: failing == Some(kind),
                }) as Box<dyn Phase>
            })
            .collect()
    }

    fn counting_observer() -> (HotkeyObserver, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&stops);
        let observer = HotkeyObserver::from_parts(
            None,
            Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (observer, stops)
    }

    fn driver(config: AutomationConfig, phases: Vec<Box<dyn Phase>>) -> (Driver, Arc<AtomicUsize>) {
        let screen = FakeScreen::new();
        let (ctx, _) = context(&screen);
        let (observer, stops) = counting_observer();
        (Driver::new(config, ctx, phases, observer).unwrap(), stops)
    }

    #[test]
    fn test_resume_offset_applies_once() {
        let trace = Trace::default();
        let config = AutomationConfig {
            phases: vec![Start, Collect, Restart, Difficulty],
            starting_phase: Some(Collect),
            cycles: Some(2),
            ..Default::default()
        };
        let (d, stops) = driver(config, scripted(&trace, PhaseOutcome::Completed, None));
        d.run().unwrap();

        assert_eq!(
            *trace.lock().unwrap(),
            vec![Collect, Restart, Difficulty, Start, Collect, Restart, Difficulty]
        );
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_starting_phase_outside_sequence_runs_everything() {
        let trace = Trace::default();
        let config = AutomationConfig {
            phases: vec![Start, Collect, Restart],
            starting_phase: Some(Difficulty),
            cycles: Some(1),
            ..Default::default()
        };
        let (d, _) = driver(config, scripted(&trace, PhaseOutcome::Completed, None));
        d.run().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec![Start, Collect, Restart]);
    }

    #[test]
    fn test_archive_needs_successful_collect() {
        let trace = Trace::default();
        let config = AutomationConfig { starting_phase: Some(Difficulty), cycles: Some(1), ..Default::default() };
        let (d, _) = driver(config.clone(), scripted(&trace, PhaseOutcome::Completed, None));
        d.run().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec![Difficulty, Start, Collect, Restart]);

        let trace = Trace::default();
        let (d, _) = driver(config, scripted(&trace, PhaseOutcome::Succeeded, None));
        d.run().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec![Difficulty, Start, Collect, Archive, Restart]);
    }

    #[test]
    fn test_resuming_at_archive_runs_it() {
        let trace = Trace::default();
        let config = AutomationConfig { starting_phase: Some(Archive), cycles: Some(1), ..Default::default() };
        let (d, _) = driver(config, scripted(&trace, PhaseOutcome::Completed, None));
        d.run().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec![Archive, Restart]);
    }

    #[test]
    fn test_missing_starting_phase_runs_everything() {
        let trace = Trace::default();
        let config = AutomationConfig {
            phases: vec![Restart, Start, Collect],
            starting_phase: None,
            cycles: Some(1),
            ..Default::default()
        };
        let (d, _) = driver(config, scripted(&trace, PhaseOutcome::Completed, None));
        d.run().unwrap();
        assert_eq!(*trace.lock().unwrap(), vec![Restart, Start, Collect]);
    }

    #[test]
    fn test_failure_stops_loop_and_observer() {
        let trace = Trace::default();
        let config = AutomationConfig { starting_phase: Some(Difficulty), ..Default::default() };
        let (d, stops) = driver(config, scripted(&trace, PhaseOutcome::Succeeded, Some(Collect)));
        let err = d.run().unwrap_err();

        assert!(format!("{:#}", err).contains("collect phase failed"));
        assert_eq!(*trace.lock().unwrap(), vec![Difficulty, Start, Collect]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    struct Panicking;

    impl Phase for Panicking {
        fn kind(&self) -> PhaseKind {
            Start
        }

        fn run(&self, _ctx: &Context) -> Result<PhaseOutcome> {
            panic!("phase blew up");
        }
    }

    #[test]
    fn test_observer_stopped_on_panic() {
        let config = AutomationConfig { phases: vec![Start], cycles: Some(1), ..Default::default() };
        let (d, stops) = driver(config, vec![Box::new(Panicking)]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| d.run()));
        assert!(result.is_err());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejects_bad_config() {
        let screen = FakeScreen::new();
        let (ctx, _) = context(&screen);
        let config = AutomationConfig { difficulty: 30, ..Default::default() };
        let trace = Trace::default();
        let err = Driver::new(config, ctx, scripted(&trace, PhaseOutcome::Completed, None), HotkeyObserver::inert());
        assert_eq!(err.err(), Some(ConfigError::DifficultyOutOfRange(30)));

        let (ctx, _) = context(&screen);
        let err = Driver::new(AutomationConfig::default(), ctx, vec![Box::new(Panicking)], HotkeyObserver::inert());
        assert_eq!(err.err(), Some(ConfigError::UnknownPhase("difficulty".into())));
    }

    #[test]
    fn test_start_paused_waits_for_toggle() {
        let screen = FakeScreen::new();
        let (ctx, sleeper) = context(&screen);
        let pause = Arc::clone(&ctx.pause);
        sleeper.on_sleep(move |n, _| {
            if n == 3 {
                pause.toggle();
            }
        });
        let trace = Trace::default();
        let config = AutomationConfig { phases: vec![Start], start_paused: true, cycles: Some(1), ..Default::default() };
        let d = Driver::new(config, ctx, scripted(&trace, PhaseOutcome::Completed, None), HotkeyObserver::inert()).unwrap();
        d.run().unwrap();
        assert_eq!(sleeper.calls(), 3);
        assert_eq!(*trace.lock().unwrap(), vec![Start]);
    }
}
