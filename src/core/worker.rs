//! Runs the detector on a background thread so the console thread stays free
//! for commands.

use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::warn;

use crate::core::screen_capture::FrameSource;
use crate::core::window::WindowLocator;
use crate::detector::{ControlCommand, Detector, LoopState};
use crate::notify::NotificationSink;

pub struct DetectorWorker {
    tx: Sender<ControlCommand>,
    state: Arc<Mutex<LoopState>>,
    handle: Option<JoinHandle<()>>,
}

impl DetectorWorker {
    /// Spawn the detection loop. The worker owns its collaborators; the
    /// caller keeps only the command channel and the shared state.
    pub fn spawn(
        mut detector: Detector,
        mut frames: Box<dyn FrameSource + Send>,
        locator: Box<dyn WindowLocator + Send>,
        sink: Box<dyn NotificationSink + Send>,
    ) -> Self {
        let state = detector.state_handle();
        let (tx, rx) = channel();
        let handle = std::thread::spawn(move || {
            detector.run(frames.as_mut(), locator.as_ref(), sink.as_ref(), &rx);
        });
        Self {
            tx,
            state,
            handle: Some(handle),
        }
    }

    /// Send a command to the loop. Returns false once the loop is gone.
    pub fn send(&self, command: ControlCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn state(&self) -> LoopState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(LoopState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        self.state() != LoopState::Stopped
    }

    /// Poll until the loop reaches `target` or the timeout expires.
    pub fn wait_for(&self, target: LoopState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let current = self.state();
            if current == target {
                return true;
            }
            // A stopped loop will never reach anything else.
            if current == LoopState::Stopped && target != LoopState::Stopped {
                return false;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Ask the loop to stop and wait for the thread to finish.
    pub fn stop(&mut self) {
        let _ = self.tx.send(ControlCommand::Stop);
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("detector thread panicked");
            }
        }
    }
}

impl Drop for DetectorWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
