mod calibration;
mod core;
mod detection;
mod detector;
mod notify;
mod settings;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::settings::ColorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    /// Colored console lines.
    Console,
    /// Native message boxes on top of the game window.
    MessageBox,
}

/// Watches a game window for the player, the target and traps by color, and
/// raises notifications on trap and target events.
#[derive(Debug, Parser)]
#[command(name = "gamedetector", version)]
struct Args {
    /// Title substring of the window to capture.
    #[arg(long, default_value = "BlueStacks")]
    window: String,

    /// Path of the color configuration file.
    #[arg(long, default_value = ColorSettings::DEFAULT_FILE)]
    config: PathBuf,

    /// Notification backend.
    #[arg(long, value_enum, default_value_t = SinkKind::Console)]
    sink: SinkKind,

    /// Milliseconds between detection cycles.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Run only the color calibration tool, then exit.
    #[arg(long)]
    calibrate: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(args);
}

#[cfg(windows)]
fn run(args: Args) {
    use std::time::Duration;

    use log::error;

    use crate::calibration::ColorPicker;
    use crate::core::screen_capture::GdiFrameSource;
    use crate::core::window::{Win32WindowLocator, WindowLocator};
    use crate::core::worker::DetectorWorker;
    use crate::detector::{ControlCommand, Detector, LoopState};
    use crate::notify::{console::ConsoleSink, NotificationSink};

    let locator = Win32WindowLocator;

    if args.calibrate {
        let mut frames = GdiFrameSource::new();
        let region = locator
            .find_by_title(&args.window)
            .ok()
            .flatten()
            .map(|window| window.rect)
            .unwrap_or_else(|| locator.fallback_region());
        let mut picker = ColorPicker::new(args.config, region);
        if let Err(e) = picker.run(&mut frames, &locator) {
            error!("{e}");
            std::process::exit(1);
        }
        return;
    }

    let mut detector = Detector::new(args.window.clone(), args.config.clone());
    detector.set_cycle_interval(Duration::from_millis(args.interval_ms));

    let sink: Box<dyn NotificationSink + Send> = match args.sink {
        SinkKind::Console => Box::new(ConsoleSink::new("gamedetector")),
        SinkKind::MessageBox => Box::new(crate::notify::message_box::MessageBoxSink::new(
            "Game Detector",
        )),
    };

    let mut worker = DetectorWorker::spawn(
        detector,
        Box::new(GdiFrameSource::new()),
        Box::new(Win32WindowLocator),
        sink,
    );

    println!("Commands: [c]alibrate  [r]eload  [s]ave  [w]indow next  [p]revious  [l]ist  [q]uit");

    // read_line instead of holding the stdin lock: the calibration tool
    // takes the lock for its own session.
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if !worker.is_running() {
            break;
        }
        match line.trim() {
            "" => {}
            "q" | "quit" | "exit" => break,
            "c" | "calibrate" => {
                worker.send(ControlCommand::Suspend);
                if worker.wait_for(LoopState::PausedForSubtool, Duration::from_secs(5)) {
                    let mut frames = GdiFrameSource::new();
                    let region = locator
                        .find_by_title(&args.window)
                        .ok()
                        .flatten()
                        .map(|window| window.rect)
                        .unwrap_or_else(|| locator.fallback_region());
                    let mut picker = ColorPicker::new(args.config.clone(), region);
                    if let Err(e) = picker.run(&mut frames, &locator) {
                        error!("{e}");
                    }
                    worker.send(ControlCommand::Resume);
                } else {
                    error!("detection loop did not pause; calibration skipped");
                }
            }
            "r" | "reload" => {
                worker.send(ControlCommand::ReloadConfig);
            }
            "s" | "save" => {
                worker.send(ControlCommand::SaveConfig);
            }
            "w" | "next" => {
                worker.send(ControlCommand::NextWindow);
            }
            "p" | "prev" => {
                worker.send(ControlCommand::PrevWindow);
            }
            "l" | "list" => {
                worker.send(ControlCommand::ListWindows);
            }
            other => println!("unknown command: {other}"),
        }
    }

    worker.stop();
}

#[cfg(not(windows))]
fn run(_args: Args) {
    eprintln!("gamedetector requires Windows: screen capture and window lookup use the Win32 API");
    std::process::exit(1);
}
