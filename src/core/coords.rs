/// Axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Size of the degraded fallback capture region used when no window can be
/// located.
pub const FALLBACK_WIDTH: i32 = 800;
pub const FALLBACK_HEIGHT: i32 = 600;

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether a screen-coordinate point falls inside this region
    /// (right/bottom edges exclusive, as pixel indices).
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    /// Fixed-size region centered on a display of the given size, clamped to
    /// fit. This is the degraded fallback when window location fails.
    pub fn centered_fallback(screen_width: i32, screen_height: i32) -> Self {
        let width = FALLBACK_WIDTH.min(screen_width.max(1));
        let height = FALLBACK_HEIGHT.min(screen_height.max(1));
        Self {
            x: screen_width / 2 - width / 2,
            y: screen_height / 2 - height / 2,
            width,
            height,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}
