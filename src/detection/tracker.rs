//! Per-cycle object tracking on top of the color classifier.

use log::debug;

use crate::detection::classifier::{classify, Blob, Frame};
use crate::detection::color::ObjectClass;
use crate::settings::ColorSettings;

/// Blobs below this pixel area are treated as noise (anti-aliasing artifacts,
/// stray matching pixels) and never reported as detections.
pub const MIN_BLOB_AREA: u32 = 100;

/// Tracks the last-known player/target positions and the current trap boxes.
///
/// Player and target are single-instance: only the largest qualifying blob
/// counts, and its center is retained across frames where nothing qualifies
/// (a missed detection does not mean the object vanished). Trap boxes carry
/// no identity and are fully replaced every cycle.
pub struct ObjectTracker {
    player_pos: Option<(i32, i32)>,
    target_pos: Option<(i32, i32)>,
    trap_boxes: Vec<Blob>,
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self {
            player_pos: None,
            target_pos: None,
            trap_boxes: Vec::new(),
        }
    }
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one detection cycle over a fresh frame.
    pub fn update(&mut self, frame: &Frame, colors: &ColorSettings) {
        if let Some(blob) = largest_blob(&classify(frame, &colors.range(ObjectClass::Player))) {
            self.player_pos = Some(blob.center());
            debug!("player detected at {:?}", self.player_pos);
        }

        if let Some(blob) = largest_blob(&classify(frame, &colors.range(ObjectClass::Target))) {
            self.target_pos = Some(blob.center());
            debug!("target detected at {:?}", self.target_pos);
        }

        self.trap_boxes = classify(frame, &colors.range(ObjectClass::Trap))
            .into_iter()
            .filter(|blob| blob.area >= MIN_BLOB_AREA)
            .collect();
        if !self.trap_boxes.is_empty() {
            debug!("{} trap(s) detected", self.trap_boxes.len());
        }
    }

    pub fn player_pos(&self) -> Option<(i32, i32)> {
        self.player_pos
    }

    pub fn target_pos(&self) -> Option<(i32, i32)> {
        self.target_pos
    }

    pub fn trap_boxes(&self) -> &[Blob] {
        &self.trap_boxes
    }
}

/// Largest qualifying blob; the first one wins on equal areas so selection is
/// deterministic for a given classification order.
fn largest_blob(blobs: &[Blob]) -> Option<Blob> {
    blobs
        .iter()
        .filter(|blob| blob.area >= MIN_BLOB_AREA)
        .fold(None, |best: Option<Blob>, blob| match best {
            Some(current) if current.area >= blob.area => Some(current),
            _ => Some(*blob),
        })
}
