//! GUI-backed notification sink using a Windows message box.

use std::thread;

use windows::core::HSTRING;
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, MB_ICONINFORMATION, MB_ICONWARNING, MB_SETFOREGROUND, MB_SYSTEMMODAL,
};

use crate::notify::{NotificationColor, NotificationSink};

/// Shows each notification as a message box on its own thread so the
/// detection loop never blocks on the user dismissing it.
pub struct MessageBoxSink {
    title: String,
}

impl MessageBoxSink {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string() }
    }
}

impl NotificationSink for MessageBoxSink {
    fn show(&self, message: &str, color: NotificationColor) {
        let icon = match color {
            NotificationColor::Red => MB_ICONWARNING,
            NotificationColor::Green | NotificationColor::Blue => MB_ICONINFORMATION,
        };
        let title = HSTRING::from(self.title.as_str());
        let text = HSTRING::from(message);
        thread::spawn(move || unsafe {
            let _ = MessageBoxW(None, &text, &title, icon | MB_SETFOREGROUND | MB_SYSTEMMODAL);
        });
    }
}
