//! HSV color model used for thresholding.
//!
//! HSV is preferred over RGB because the hue channel is mostly stable under
//! brightness changes inside the emulator window. Values follow the 8-bit
//! OpenCV convention: hue 0-179, saturation and value 0-255.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One HSV pixel value (hue 0-179, saturation/value 0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const MAX_HUE: u8 = 179;

    pub fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl From<[u8; 3]> for Hsv {
    fn from(t: [u8; 3]) -> Self {
        Self::new(t[0], t[1], t[2])
    }
}

impl From<Hsv> for [u8; 3] {
    fn from(hsv: Hsv) -> Self {
        [hsv.h, hsv.s, hsv.v]
    }
}

impl fmt::Display for Hsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.h, self.s, self.v)
    }
}

/// Convert an RGB pixel to 8-bit HSV (hue halved to fit 0-179).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let mut h_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h_deg < 0.0 {
        h_deg += 360.0;
    }

    Hsv {
        h: ((h_deg / 2.0).round() as u32).min(Hsv::MAX_HUE as u32) as u8,
        s: s.round() as u8,
        v: v.round() as u8,
    }
}

/// An inclusive HSV interval.
///
/// A single contiguous `[lower, upper]` interval per channel is assumed. Hue
/// wrap-around (e.g. red spanning 170-179 and 0-10) is not expressible here;
/// callers that need it must classify twice and merge the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    pub fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    /// Boundary-inclusive membership test per channel.
    pub fn contains(&self, hsv: Hsv) -> bool {
        self.lower.h <= hsv.h
            && hsv.h <= self.upper.h
            && self.lower.s <= hsv.s
            && hsv.s <= self.upper.s
            && self.lower.v <= hsv.v
            && hsv.v <= self.upper.v
    }

    /// A range is valid when every lower channel is <= its upper counterpart
    /// and hue stays within the 8-bit convention.
    pub fn is_valid(&self) -> bool {
        self.lower.h <= self.upper.h
            && self.lower.s <= self.upper.s
            && self.lower.v <= self.upper.v
            && self.upper.h <= Hsv::MAX_HUE
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H[{}-{}] S[{}-{}] V[{}-{}]",
            self.lower.h, self.upper.h, self.lower.s, self.upper.s, self.lower.v, self.upper.v
        )
    }
}

/// The three semantic classes the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Player,
    Target,
    Trap,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 3] = [ObjectClass::Player, ObjectClass::Target, ObjectClass::Trap];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::Player => "player",
            ObjectClass::Target => "target",
            ObjectClass::Trap => "trap",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
