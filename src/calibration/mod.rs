//! Interactive color picker - console-driven calibration of the three HSV
//! ranges. Runs until the user exits, writes the configuration file when
//! asked to, then returns control to the caller.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::{error, info};

use crate::core::coords::Region;
use crate::core::error::DetectorError;
use crate::core::screen_capture::FrameSource;
use crate::core::window::WindowLocator;
use crate::detection::color::{rgb_to_hsv, ColorRange, Hsv, ObjectClass};
use crate::settings::ColorSettings;

/// Per-class hue tolerance applied around a sampled pixel. Saturation and
/// value always get +/-50.
fn hue_tolerance(class: ObjectClass) -> u8 {
    match class {
        ObjectClass::Player => 15,
        ObjectClass::Target => 20,
        ObjectClass::Trap => 10,
    }
}

const SV_TOLERANCE: u8 = 50;

/// Build a range around a sampled HSV value, clamped to valid bounds.
///
/// Hue clamps at 0 and 179 rather than wrapping, so sampling a red shade
/// near the hue seam produces a truncated range; pick the other side of the
/// seam (or edit the bounds manually) when that matters.
pub fn range_around(sample: Hsv, class: ObjectClass) -> ColorRange {
    let h_tol = hue_tolerance(class);
    ColorRange::new(
        Hsv::new(
            sample.h.saturating_sub(h_tol),
            sample.s.saturating_sub(SV_TOLERANCE),
            sample.v.saturating_sub(SV_TOLERANCE),
        ),
        Hsv::new(
            (sample.h + h_tol).min(Hsv::MAX_HUE),
            sample.s.saturating_add(SV_TOLERANCE),
            sample.v.saturating_add(SV_TOLERANCE),
        ),
    )
}

enum PickerStep {
    Continue,
    Exit,
}

/// Interactive calibration tool. Owns its own copy of the settings for the
/// duration of the session; the detection loop reloads the file afterwards.
pub struct ColorPicker {
    config_path: PathBuf,
    region: Region,
    settings: ColorSettings,
    mode: ObjectClass,
    changed: bool,
    quit_armed: bool,
}

impl ColorPicker {
    pub fn new(config_path: PathBuf, region: Region) -> Self {
        let settings = ColorSettings::load(&config_path);
        Self {
            config_path,
            region,
            settings,
            mode: ObjectClass::Player,
            changed: false,
            quit_armed: false,
        }
    }

    /// Run the calibration session over stdin until the user exits.
    pub fn run(
        &mut self,
        frames: &mut dyn FrameSource,
        locator: &dyn WindowLocator,
    ) -> Result<(), DetectorError> {
        println!("=== Color picker ===");
        println!("Capture region: {}", self.region);
        self.print_help();
        self.print_ranges();

        let stdin = io::stdin();
        self.prompt();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            match self.handle_line(line.trim(), frames, locator) {
                PickerStep::Continue => self.prompt(),
                PickerStep::Exit => break,
            }
        }

        info!("color picker finished");
        Ok(())
    }

    fn prompt(&self) {
        print!("[{}]> ", self.mode);
        let _ = io::stdout().flush();
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  1 | player         calibrate the player color");
        println!("  2 | target         calibrate the target color");
        println!("  3 | trap           calibrate the trap color");
        println!("  sample             sample the pixel under the mouse cursor");
        println!("  set <lower|upper> <h> <s> <v>   edit the active range directly");
        println!("  show               print all current ranges");
        println!("  save               write the configuration file");
        println!("  quit               exit (asks again if there are unsaved changes)");
    }

    fn print_ranges(&self) {
        for class in ObjectClass::ALL {
            println!("  {}: {}", class, self.settings.range(class));
        }
    }

    fn handle_line(
        &mut self,
        line: &str,
        frames: &mut dyn FrameSource,
        locator: &dyn WindowLocator,
    ) -> PickerStep {
        if !matches!(line, "quit" | "exit" | "q") {
            self.quit_armed = false;
        }
        match line {
            "" => {}
            "1" | "player" => {
                self.mode = ObjectClass::Player;
                println!("calibrating the player color");
            }
            "2" | "target" => {
                self.mode = ObjectClass::Target;
                println!("calibrating the target color");
            }
            "3" | "trap" => {
                self.mode = ObjectClass::Trap;
                println!("calibrating the trap color");
            }
            "sample" => self.sample(frames, locator),
            "show" => self.print_ranges(),
            "save" => match self.settings.save(&self.config_path) {
                Ok(()) => {
                    self.changed = false;
                    println!("configuration saved to {}", self.config_path.display());
                }
                Err(e) => {
                    error!("{e}");
                    println!("could not save: {e}");
                }
            },
            "quit" | "exit" | "q" => {
                if self.changed && !self.quit_armed {
                    println!("unsaved changes; 'save' first, or 'quit' again to discard them");
                    self.quit_armed = true;
                } else {
                    return PickerStep::Exit;
                }
            }
            other => {
                if let Some(rest) = other.strip_prefix("set ") {
                    self.set_bound(rest);
                } else {
                    println!("unknown command: {other}");
                }
            }
        }
        PickerStep::Continue
    }

    /// Sample the pixel under the cursor from a fresh capture and rebuild the
    /// active class's range around it.
    fn sample(&mut self, frames: &mut dyn FrameSource, locator: &dyn WindowLocator) {
        let Some((cx, cy)) = locator.cursor_pos() else {
            println!("cursor position unavailable");
            return;
        };
        if !self.region.contains(cx, cy) {
            println!("cursor ({cx}, {cy}) is outside the capture region {}", self.region);
            return;
        }

        let frame = match frames.capture(self.region) {
            Ok(frame) => frame,
            Err(e) => {
                println!("capture failed: {e}");
                return;
            }
        };

        let x = (cx - self.region.x) as u32;
        let y = (cy - self.region.y) as u32;
        let pixel = frame.get_pixel(x, y);
        let hsv = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
        let range = range_around(hsv, self.mode);
        self.settings.set_range(self.mode, range);
        self.changed = true;
        println!("sampled HSV {} for {} -> {}", hsv, self.mode, range);
    }

    /// `set <lower|upper> <h> <s> <v>` - direct bound editing.
    fn set_bound(&mut self, args: &str) {
        let parts: Vec<&str> = args.split_whitespace().collect();
        let parsed = match parts.as_slice() {
            [which @ ("lower" | "upper"), h, s, v] => {
                match (h.parse::<u8>(), s.parse::<u8>(), v.parse::<u8>()) {
                    (Ok(h), Ok(s), Ok(v)) => Some((*which, Hsv::new(h, s, v))),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some((which, hsv)) = parsed else {
            println!("usage: set <lower|upper> <h 0-179> <s 0-255> <v 0-255>");
            return;
        };

        let mut range = self.settings.range(self.mode);
        if which == "lower" {
            range.lower = hsv;
        } else {
            range.upper = hsv;
        }
        if !range.is_valid() {
            println!("rejected: {range} violates lower<=upper or hue<=179");
            return;
        }
        self.settings.set_range(self.mode, range);
        self.changed = true;
        println!("{}: {}", self.mode, range);
    }
}
