//! Color-range classification: turns a captured frame into labeled blobs.

use image::{ImageBuffer, Rgb};

use crate::detection::color::{rgb_to_hsv, ColorRange};

/// One captured frame. Never mutated; every cycle captures a fresh one.
pub type Frame = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// A maximal 8-connected region of pixels matching a color range, described
/// by its bounding box and pixel area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub area: u32,
}

impl Blob {
    /// Center of the bounding box, matching the original detector's
    /// integer-division convention.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Closed-rectangle containment test (both edges inclusive).
    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        self.x <= px && px <= self.x + self.width && self.y <= py && py <= self.y + self.height
    }
}

/// Classify a frame against one color range.
///
/// Converts each pixel to HSV, builds a boundary-inclusive binary mask and
/// extracts 8-connected components with their bounding boxes and pixel areas.
/// An empty mask yields an empty list; that is a valid outcome, not an error.
///
/// Hue wrap-around ranges are not supported (see [`ColorRange`]); classify
/// twice and merge when a class straddles the red seam.
pub fn classify(frame: &Frame, range: &ColorRange) -> Vec<Blob> {
    let (width, height) = frame.dimensions();
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut mask = vec![false; width * height];
    for (x, y, pixel) in frame.enumerate_pixels() {
        let hsv = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
        if range.contains(hsv) {
            mask[y as usize * width + x as usize] = true;
        }
    }

    extract_blobs(&mask, width, height)
}

/// Flood-fill connected-component labeling over a binary mask.
fn extract_blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
    let mut visited = vec![false; mask.len()];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        let (mut min_x, mut max_x) = (start % width, start % width);
        let (mut min_y, mut max_y) = (start / width, start / width);
        let mut area = 0u32;

        visited[start] = true;
        stack.push(start);
        while let Some(index) = stack.pop() {
            let (x, y) = (index % width, index / width);
            area += 1;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            // 8-connectivity
            let x_lo = x.saturating_sub(1);
            let y_lo = y.saturating_sub(1);
            let x_hi = (x + 1).min(width - 1);
            let y_hi = (y + 1).min(height - 1);
            for ny in y_lo..=y_hi {
                for nx in x_lo..=x_hi {
                    let neighbor = ny * width + nx;
                    if mask[neighbor] && !visited[neighbor] {
                        visited[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }
        }

        blobs.push(Blob {
            x: min_x as i32,
            y: min_y as i32,
            width: (max_x - min_x + 1) as i32,
            height: (max_y - min_y + 1) as i32,
            area,
        });
    }

    blobs
}
