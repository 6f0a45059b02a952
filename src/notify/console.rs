//! Console-backed notification sink.

use crate::notify::{NotificationColor, NotificationSink};

/// Prints notifications as ANSI-colored console lines. Used when no GUI
/// backend is wanted, and as the portable default.
pub struct ConsoleSink {
    title: String,
}

impl ConsoleSink {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string() }
    }
}

impl NotificationSink for ConsoleSink {
    fn show(&self, message: &str, color: NotificationColor) {
        let code = match color {
            NotificationColor::Red => "31",
            NotificationColor::Green => "32",
            NotificationColor::Blue => "34",
        };
        println!("\x1b[{}m[{}] {}\x1b[0m", code, self.title, message.replace('\n', " "));
    }
}
