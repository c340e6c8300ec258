use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn, LevelFilter};

use ranger_core::driver::Driver;
use ranger_core::logger;
use ranger_core::ocr::{NullRecognizer, SidecarRecognizer, TextRecognizer};
use ranger_core::pause::PauseController;
use ranger_core::phases::{self, Context};
use ranger_core::platform::{create_platform, hotkey};
use ranger_core::settings::AutomationConfig;
use ranger_core::sleep::{Sleeper, ThreadSleeper};

/// Value following `flag` on the command line.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn run(config: AutomationConfig, force_stub: bool) -> Result<()> {
    let platform = create_platform(force_stub);

    let recognizer: Arc<dyn TextRecognizer> = match &config.ocr.command {
        _ if force_stub => Arc::new(NullRecognizer),
        Some(command) => Arc::new(SidecarRecognizer::spawn(command, &config.ocr.args, config.ocr.timeout())?),
        None => {
            warn!(target: "ocr", "no OCR command configured, text searches will never match");
            Arc::new(NullRecognizer)
        }
    };

    let sleeper: Arc<dyn Sleeper> = Arc::new(ThreadSleeper::new(config.timings.jitter));
    let pause = Arc::new(PauseController::new(
        Arc::clone(&sleeper),
        config.timings.poll_interval(),
        config.timings.heartbeat_every,
    ));
    let observer = hotkey::start_pause_hotkey(Arc::clone(&pause));

    let ctx = Context::new(&config, platform, recognizer, pause, sleeper);
    let driver = Driver::new(config, ctx, phases::standard(), observer)?;
    driver.run()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let force_stub = args.iter().any(|a| a == "--stub");

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings_path = flag_value(&args, "--settings")
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join("settings.json"));

    logger::init(&cwd.join("logs"), LevelFilter::Info, true);
    info!("ranger started, press F11 to pause or resume");

    let config = AutomationConfig::load(&settings_path);
    let result = run(config, force_stub);
    match &result {
        Ok(()) => info!("ranger finished"),
        Err(e) => error!("ranger stopped: {:#}", e),
    }
    log::logger().flush();
    result
}
