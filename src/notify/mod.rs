//! Notification delivery: sink abstraction plus rate limiting.

pub mod console;
#[cfg(windows)]
pub mod message_box;

use std::time::{Duration, Instant};

use log::{debug, info};

/// Semantic color tag attached to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationColor {
    Red,
    Green,
    Blue,
}

impl NotificationColor {
    /// Background color the original tool used for each tag.
    pub fn hex(&self) -> &'static str {
        match self {
            NotificationColor::Red => "#FF3333",
            NotificationColor::Green => "#33CC33",
            NotificationColor::Blue => "#3366FF",
        }
    }
}

/// Which rate-limit bucket and color a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Trap,
    Target,
    Generic,
}

impl NotificationKind {
    pub fn color(&self) -> NotificationColor {
        match self {
            NotificationKind::Trap => NotificationColor::Red,
            NotificationKind::Target => NotificationColor::Green,
            NotificationKind::Generic => NotificationColor::Blue,
        }
    }

    /// Minimum spacing for this kind. The timestamp itself is shared across
    /// all kinds, so any delivered notification delays every other kind too.
    pub fn min_interval(&self) -> Duration {
        match self {
            NotificationKind::Trap | NotificationKind::Target => Duration::from_secs(5),
            NotificationKind::Generic => Duration::from_secs(3),
        }
    }
}

/// Fire-and-forget notification backend. The detector never consumes a
/// return value from it.
pub trait NotificationSink {
    fn show(&self, message: &str, color: NotificationColor);
}

/// Rate-limits notifications so a condition flickering at a threshold does
/// not produce a storm. A single shared timestamp covers all event kinds.
pub struct NotificationGate {
    last_notification_time: Option<Instant>,
}

impl Default for NotificationGate {
    fn default() -> Self {
        Self { last_notification_time: None }
    }
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` through `sink` unless a notification of any kind
    /// went out less than the kind's minimum interval ago. Returns whether
    /// the message was sent.
    pub fn maybe_notify(
        &mut self,
        sink: &dyn NotificationSink,
        kind: NotificationKind,
        message: &str,
    ) -> bool {
        self.maybe_notify_at(Instant::now(), sink, kind, message)
    }

    /// Same as [`maybe_notify`](Self::maybe_notify) with the clock injected.
    pub fn maybe_notify_at(
        &mut self,
        now: Instant,
        sink: &dyn NotificationSink,
        kind: NotificationKind,
        message: &str,
    ) -> bool {
        if let Some(last) = self.last_notification_time {
            if now.duration_since(last) < kind.min_interval() {
                debug!("notification suppressed by rate limit: {:?}", kind);
                return false;
            }
        }

        sink.show(message, kind.color());
        self.last_notification_time = Some(now);
        info!("notification sent ({:?}): {}", kind, message.replace('\n', " "));
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every delivered message; shared between test and detector.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink {
        pub sent: Arc<Mutex<Vec<(String, NotificationColor)>>>,
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, message: &str, color: NotificationColor) {
            self.sent.lock().unwrap().push((message.to_string(), color));
        }
    }

    #[test]
    fn first_notification_always_passes() {
        let sink = RecordingSink::default();
        let mut gate = NotificationGate::new();
        assert!(gate.maybe_notify_at(Instant::now(), &sink, NotificationKind::Trap, "trapped"));
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn second_event_within_interval_is_suppressed() {
        let sink = RecordingSink::default();
        let mut gate = NotificationGate::new();
        let t0 = Instant::now();
        assert!(gate.maybe_notify_at(t0, &sink, NotificationKind::Trap, "first"));
        assert!(!gate.maybe_notify_at(
            t0 + Duration::from_secs(1),
            &sink,
            NotificationKind::Target,
            "second",
        ));
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn delivery_resumes_after_the_interval() {
        let sink = RecordingSink::default();
        let mut gate = NotificationGate::new();
        let t0 = Instant::now();
        assert!(gate.maybe_notify_at(t0, &sink, NotificationKind::Target, "reached"));
        assert!(gate.maybe_notify_at(
            t0 + Duration::from_secs(5),
            &sink,
            NotificationKind::Target,
            "again",
        ));
        assert_eq!(sink.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn generic_kind_uses_the_shorter_interval() {
        let sink = RecordingSink::default();
        let mut gate = NotificationGate::new();
        let t0 = Instant::now();
        assert!(gate.maybe_notify_at(t0, &sink, NotificationKind::Generic, "saved"));
        assert!(!gate.maybe_notify_at(
            t0 + Duration::from_secs(2),
            &sink,
            NotificationKind::Generic,
            "saved again",
        ));
        assert!(gate.maybe_notify_at(
            t0 + Duration::from_secs(3),
            &sink,
            NotificationKind::Generic,
            "saved later",
        ));
    }

    #[test]
    fn kinds_map_to_semantic_colors() {
        assert_eq!(NotificationKind::Trap.color(), NotificationColor::Red);
        assert_eq!(NotificationKind::Target.color(), NotificationColor::Green);
        assert_eq!(NotificationKind::Generic.color(), NotificationColor::Blue);
    }
}
