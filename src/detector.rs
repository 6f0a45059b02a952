//! The detection loop: capture, track, derive events, notify. Runs until a
//! Stop command arrives, surviving lost windows and failed captures.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};

use crate::core::coords::Region;
use crate::core::screen_capture::FrameSource;
use crate::core::window::{WindowInfo, WindowLocator};
use crate::detection::classifier::Frame;
use crate::detection::events::{EventEngine, GameEvent};
use crate::detection::tracker::ObjectTracker;
use crate::notify::{NotificationGate, NotificationKind, NotificationSink};
use crate::settings::ColorSettings;

pub const TRAP_MESSAGE: &str = "GAME OVER!\nYou stepped into a trap!";
pub const TARGET_MESSAGE: &str = "Congratulations!\nYou reached the target!";

/// How many cycles between checks that the tracked window still exists.
const WINDOW_CHECK_CYCLES: u32 = 50;

const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_CAPTURE_BACKOFF: Duration = Duration::from_secs(1);

/// Externally observable phase of the detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Capturing,
    Running,
    PausedForSubtool,
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::Initializing => "initializing",
            LoopState::Capturing => "capturing",
            LoopState::Running => "running",
            LoopState::PausedForSubtool => "paused",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Commands the control thread can send into the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    /// Park the loop so another tool can own the console and the screen.
    Suspend,
    /// Leave the parked state, reloading the configuration file first.
    Resume,
    ReloadConfig,
    SaveConfig,
    NextWindow,
    PrevWindow,
    ListWindows,
}

enum Flow {
    Continue,
    Shutdown,
}

pub struct Detector {
    window_title: String,
    config_path: PathBuf,
    settings: ColorSettings,
    tracker: ObjectTracker,
    events: EventEngine,
    gate: NotificationGate,
    state: Arc<Mutex<LoopState>>,
    window: Option<WindowInfo>,
    available_windows: Vec<WindowInfo>,
    current_window_index: usize,
    region: Region,
    cycle_interval: Duration,
    capture_backoff: Duration,
}

impl Detector {
    pub fn new(window_title: String, config_path: PathBuf) -> Self {
        let settings = ColorSettings::load(&config_path);
        Self {
            window_title,
            config_path,
            settings,
            tracker: ObjectTracker::new(),
            events: EventEngine::new(),
            gate: NotificationGate::new(),
            state: Arc::new(Mutex::new(LoopState::Initializing)),
            window: None,
            available_windows: Vec::new(),
            current_window_index: 0,
            region: Region::new(0, 0, 0, 0),
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            capture_backoff: DEFAULT_CAPTURE_BACKOFF,
        }
    }

    pub fn set_cycle_interval(&mut self, interval: Duration) {
        self.cycle_interval = interval;
    }

    pub fn set_capture_backoff(&mut self, backoff: Duration) {
        self.capture_backoff = backoff;
    }

    /// Shared handle for observing the loop phase from another thread.
    pub fn state_handle(&self) -> Arc<Mutex<LoopState>> {
        Arc::clone(&self.state)
    }

    pub fn region(&self) -> Region {
        self.region
    }

    fn set_state(&self, state: LoopState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    /// Run the loop until a Stop command arrives or the control channel is
    /// dropped.
    pub fn run(
        &mut self,
        frames: &mut dyn FrameSource,
        locator: &dyn WindowLocator,
        sink: &dyn NotificationSink,
        control: &Receiver<ControlCommand>,
    ) {
        self.set_state(LoopState::Initializing);
        self.resolve_window(locator);
        info!("detection started on region {}", self.region);

        let mut cycles_since_check: u32 = 0;
        loop {
            loop {
                match control.try_recv() {
                    Ok(command) => {
                        if let Flow::Shutdown = self.handle_command(command, locator, sink, control)
                        {
                            self.set_state(LoopState::Stopped);
                            info!("detection stopped");
                            return;
                        }
                    }
                    Err(std::sync::mpsc::TryRecvError::Empty) => break,
                    Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                        self.set_state(LoopState::Stopped);
                        info!("control channel closed; detection stopped");
                        return;
                    }
                }
            }

            cycles_since_check += 1;
            if cycles_since_check >= WINDOW_CHECK_CYCLES {
                cycles_since_check = 0;
                self.recheck_window(locator);
            }

            self.set_state(LoopState::Capturing);
            match frames.capture(self.region) {
                Ok(frame) => {
                    self.set_state(LoopState::Running);
                    self.cycle(&frame, sink);
                }
                Err(e) => {
                    warn!("capture failed: {e}; retrying");
                    std::thread::sleep(self.capture_backoff);
                    continue;
                }
            }

            std::thread::sleep(self.cycle_interval);
        }
    }

    /// One detection cycle over a captured frame.
    fn cycle(&mut self, frame: &Frame, sink: &dyn NotificationSink) {
        self.tracker.update(frame, &self.settings);
        let events = self.events.derive(
            self.tracker.player_pos(),
            self.tracker.target_pos(),
            self.tracker.trap_boxes(),
        );
        for event in events {
            match event {
                GameEvent::EnteredTrap => {
                    self.gate.maybe_notify(sink, NotificationKind::Trap, TRAP_MESSAGE);
                }
                GameEvent::TargetReached => {
                    self.gate.maybe_notify(sink, NotificationKind::Target, TARGET_MESSAGE);
                }
                // Exit transitions are log-only; the engine already reports
                // the trap exit and the loss is only interesting for tracing.
                GameEvent::ExitedTrap => {}
                GameEvent::TargetLost => debug!("target no longer in range"),
            }
        }
    }

    fn handle_command(
        &mut self,
        command: ControlCommand,
        locator: &dyn WindowLocator,
        sink: &dyn NotificationSink,
        control: &Receiver<ControlCommand>,
    ) -> Flow {
        debug!("control command: {:?}", command);
        match command {
            ControlCommand::Stop => return Flow::Shutdown,
            ControlCommand::Suspend => {
                if !self.pause_until_resume(control) {
                    return Flow::Shutdown;
                }
            }
            ControlCommand::Resume => {}
            ControlCommand::ReloadConfig => {
                self.settings = ColorSettings::load(&self.config_path);
            }
            ControlCommand::SaveConfig => match self.settings.save(&self.config_path) {
                Ok(()) => {
                    self.gate.maybe_notify(sink, NotificationKind::Generic, "Settings saved!");
                }
                Err(e) => warn!("{e}"),
            },
            ControlCommand::NextWindow => self.switch_window(locator, 1),
            ControlCommand::PrevWindow => self.switch_window(locator, -1),
            ControlCommand::ListWindows => self.print_windows(),
        }
        Flow::Continue
    }

    /// Park until Resume (reload the configuration and continue) or Stop.
    /// Returns false when the loop should shut down instead of resuming.
    fn pause_until_resume(&mut self, control: &Receiver<ControlCommand>) -> bool {
        self.set_state(LoopState::PausedForSubtool);
        info!("detection paused");
        loop {
            match control.recv() {
                Ok(ControlCommand::Resume) => {
                    self.settings = ColorSettings::load(&self.config_path);
                    info!("detection resumed");
                    return true;
                }
                Ok(ControlCommand::Stop) | Err(_) => return false,
                Ok(other) => debug!("ignored while paused: {:?}", other),
            }
        }
    }

    /// Re-enumerate windows and pick the capture region: the first title
    /// match, else the first window at all, else the centered fallback.
    fn resolve_window(&mut self, locator: &dyn WindowLocator) {
        self.available_windows = match locator.list_windows() {
            Ok(windows) => windows,
            Err(e) => {
                warn!("window enumeration failed: {e}");
                Vec::new()
            }
        };

        let needle = self.window_title.to_lowercase();
        let index = self
            .available_windows
            .iter()
            .position(|window| window.title.to_lowercase().contains(&needle))
            .or(if self.available_windows.is_empty() { None } else { Some(0) });

        match index {
            Some(index) => {
                self.current_window_index = index;
                let window = self.available_windows[index].clone();
                if window.title.to_lowercase().contains(&needle) {
                    info!("tracking window '{}' at {}", window.title, window.rect);
                } else {
                    warn!(
                        "no window matching '{}'; tracking '{}' instead",
                        self.window_title, window.title
                    );
                }
                self.region = window.rect;
                self.window = Some(window);
            }
            None => {
                self.window = None;
                self.region = locator.fallback_region();
                warn!("no windows found; using fallback region {}", self.region);
            }
        }
    }

    /// Periodic liveness check on the tracked window. A vanished window
    /// triggers a full re-resolve; a surviving one refreshes the region in
    /// case it moved.
    fn recheck_window(&mut self, locator: &dyn WindowLocator) {
        let Some(window) = &self.window else {
            self.resolve_window(locator);
            return;
        };
        if !locator.window_exists(window.handle) {
            warn!("window '{}' disappeared", window.title);
            self.resolve_window(locator);
        } else if let Some(rect) = locator.window_rect(window.handle) {
            if rect != self.region {
                debug!("window moved to {}", rect);
                self.region = rect;
            }
        }
    }

    /// Step to an adjacent window in the enumeration order, wrapping around.
    fn switch_window(&mut self, locator: &dyn WindowLocator, step: i32) {
        if let Ok(windows) = locator.list_windows() {
            if !windows.is_empty() {
                self.available_windows = windows;
            }
        }
        let count = self.available_windows.len();
        if count == 0 {
            warn!("no windows to switch to");
            return;
        }

        let index = (self.current_window_index as i32 + step).rem_euclid(count as i32) as usize;
        self.current_window_index = index;
        let window = self.available_windows[index].clone();
        info!("switched to window '{}' at {}", window.title, window.rect);
        self.region = window.rect;
        self.window = Some(window);
    }

    fn print_windows(&self) {
        if self.available_windows.is_empty() {
            println!("no windows available");
            return;
        }
        for (index, window) in self.available_windows.iter().enumerate() {
            let marker = if index == self.current_window_index { "*" } else { " " };
            println!("{marker} [{index}] {} {}", window.title, window.rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen_capture::tests::ScriptedFrameSource;
    use crate::core::window::tests::{window, FakeLocator};
    use crate::notify::tests::RecordingSink;
    use image::Rgb;
    use std::sync::mpsc;

    fn test_detector(name: &str) -> Detector {
        let mut path = std::env::temp_dir();
        path.push(format!("gamedetector-loop-{}-{}.json", name, std::process::id()));
        let mut detector = Detector::new("BlueStacks".to_string(), path);
        detector.set_cycle_interval(Duration::ZERO);
        detector.set_capture_backoff(Duration::ZERO);
        detector
    }

    fn paint(frame: &mut Frame, rect: (u32, u32, u32, u32), rgb: [u8; 3]) {
        for y in rect.1..rect.1 + rect.3 {
            for x in rect.0..rect.0 + rect.2 {
                frame.put_pixel(x, y, Rgb(rgb));
            }
        }
    }

    #[test]
    fn resolve_prefers_the_requested_title() {
        let mut detector = test_detector("resolve-title");
        let locator = FakeLocator {
            windows: vec![window(1, "Notepad"), window(2, "BlueStacks App Player")],
            ..FakeLocator::default()
        };
        detector.resolve_window(&locator);
        assert_eq!(detector.window.as_ref().map(|w| w.handle.0), Some(2));
        assert_eq!(detector.region(), Region::new(100, 100, 640, 480));
    }

    #[test]
    fn resolve_falls_back_to_the_first_window() {
        let mut detector = test_detector("resolve-first");
        let locator = FakeLocator {
            windows: vec![window(7, "Calculator")],
            ..FakeLocator::default()
        };
        detector.resolve_window(&locator);
        assert_eq!(detector.window.as_ref().map(|w| w.handle.0), Some(7));
    }

    #[test]
    fn resolve_uses_fallback_region_without_windows() {
        let mut detector = test_detector("resolve-fallback");
        let locator = FakeLocator::default();
        detector.resolve_window(&locator);
        assert!(detector.window.is_none());
        assert_eq!(detector.region(), Region::new(560, 240, 800, 600));
    }

    #[test]
    fn switch_window_wraps_in_both_directions() {
        let mut detector = test_detector("switch");
        let locator = FakeLocator {
            windows: vec![window(1, "aa"), window(2, "bbb"), window(3, "cccc")],
            ..FakeLocator::default()
        };
        detector.resolve_window(&locator);
        assert_eq!(detector.current_window_index, 0);

        detector.switch_window(&locator, 1);
        assert_eq!(detector.current_window_index, 1);
        detector.switch_window(&locator, -1);
        assert_eq!(detector.current_window_index, 0);
        detector.switch_window(&locator, -1);
        assert_eq!(detector.current_window_index, 2);
        detector.switch_window(&locator, 1);
        assert_eq!(detector.current_window_index, 0);
    }

    #[test]
    fn trap_entry_sends_a_red_notification() {
        let mut detector = test_detector("trap-entry");
        let sink = RecordingSink::default();

        // A red trap square with the violet player painted inside its
        // bounding box.
        let mut frame = Frame::from_pixel(64, 64, Rgb([0, 0, 0]));
        paint(&mut frame, (10, 10, 30, 30), [255, 40, 40]);
        paint(&mut frame, (15, 15, 12, 12), [255, 0, 255]);

        detector.cycle(&frame, &sink);
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TRAP_MESSAGE);
        assert_eq!(sent[0].1, crate::notify::NotificationColor::Red);
    }

    #[test]
    fn reaching_the_target_sends_a_green_notification() {
        let mut detector = test_detector("target-reached");
        let sink = RecordingSink::default();

        let mut frame = Frame::from_pixel(64, 64, Rgb([0, 0, 0]));
        paint(&mut frame, (10, 10, 12, 12), [255, 0, 255]);
        paint(&mut frame, (30, 10, 12, 12), [0, 255, 0]);

        detector.cycle(&frame, &sink);
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TARGET_MESSAGE);
        assert_eq!(sent[0].1, crate::notify::NotificationColor::Green);
    }

    #[test]
    fn staying_in_the_trap_notifies_only_once() {
        let mut detector = test_detector("trap-repeat");
        let sink = RecordingSink::default();

        let mut frame = Frame::from_pixel(64, 64, Rgb([0, 0, 0]));
        paint(&mut frame, (10, 10, 30, 30), [255, 40, 40]);
        paint(&mut frame, (15, 15, 12, 12), [255, 0, 255]);

        for _ in 0..5 {
            detector.cycle(&frame, &sink);
        }
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn run_stops_on_command_before_capturing() {
        let mut detector = test_detector("run-stop");
        let mut frames = ScriptedFrameSource::new(Vec::new());
        let locator = FakeLocator::default();
        let sink = RecordingSink::default();

        let (tx, rx) = mpsc::channel();
        tx.send(ControlCommand::Stop).unwrap();
        detector.run(&mut frames, &locator, &sink, &rx);

        assert_eq!(*detector.state_handle().lock().unwrap(), LoopState::Stopped);
        assert!(frames.captured_regions.is_empty());
    }

    #[test]
    fn run_handles_save_then_stop() {
        let mut detector = test_detector("run-save");
        let config_path = detector.config_path.clone();
        let mut frames = ScriptedFrameSource::new(Vec::new());
        let locator = FakeLocator::default();
        let sink = RecordingSink::default();

        let (tx, rx) = mpsc::channel();
        tx.send(ControlCommand::SaveConfig).unwrap();
        tx.send(ControlCommand::Stop).unwrap();
        detector.run(&mut frames, &locator, &sink, &rx);

        assert!(config_path.exists());
        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Settings saved!");
        drop(sent);
        let _ = std::fs::remove_file(&config_path);
    }

    #[test]
    fn run_suspends_resumes_and_stops() {
        let mut detector = test_detector("run-suspend");
        let mut frames = ScriptedFrameSource::new(Vec::new());
        let locator = FakeLocator::default();
        let sink = RecordingSink::default();

        let (tx, rx) = mpsc::channel();
        tx.send(ControlCommand::Suspend).unwrap();
        tx.send(ControlCommand::Resume).unwrap();
        tx.send(ControlCommand::Stop).unwrap();
        detector.run(&mut frames, &locator, &sink, &rx);

        assert_eq!(*detector.state_handle().lock().unwrap(), LoopState::Stopped);
    }

    #[test]
    fn run_stops_when_the_control_channel_closes() {
        let mut detector = test_detector("run-disconnect");
        // One black frame, then the scripted source only errors; the loop
        // must still notice the dropped channel and stop.
        let mut frames =
            ScriptedFrameSource::new(vec![Ok(Frame::from_pixel(32, 32, Rgb([0, 0, 0])))]);
        let locator = FakeLocator::default();
        let sink = RecordingSink::default();

        let (tx, rx) = mpsc::channel::<ControlCommand>();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            drop(tx);
        });
        detector.run(&mut frames, &locator, &sink, &rx);
        handle.join().unwrap();

        assert_eq!(*detector.state_handle().lock().unwrap(), LoopState::Stopped);
        assert!(!frames.captured_regions.is_empty());
    }
}
