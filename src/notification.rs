//! Lock-screen / notification content derived from session state.

use tracing::info;

use crate::config::NotificationSettings;
use crate::library::TrackRecord;
use crate::library::display::display_from_fields;
use crate::session::PlaybackStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    Previous,
    Play,
    Pause,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub text: String,
    pub album: String,
    pub track_id: String,
    /// Always `[Previous, Play | Pause, Next]`.
    pub actions: [NotificationAction; 3],
}

/// Content for `status` and `track`, or `None` when no notification should
/// be shown.
pub fn notification_for(
    status: PlaybackStatus,
    track: &TrackRecord,
    settings: &NotificationSettings,
) -> Option<Notification> {
    if track.is_nothing() {
        return None;
    }
    let toggle = match status {
        PlaybackStatus::Preparing | PlaybackStatus::Playing => NotificationAction::Pause,
        PlaybackStatus::Paused => NotificationAction::Play,
        PlaybackStatus::Idle | PlaybackStatus::Stopped | PlaybackStatus::Error => return None,
    };

    Some(Notification {
        title: display_from_fields(track, &settings.title_fields, &settings.separator),
        text: display_from_fields(track, &settings.text_fields, &settings.separator),
        album: track.album.clone(),
        track_id: track.id.clone(),
        actions: [NotificationAction::Previous, toggle, NotificationAction::Next],
    })
}

/// Where notifications end up.
pub trait NotificationSink: Send {
    fn show(&mut self, notification: &Notification);
    fn remove(&mut self);
}

/// Reports notifications through the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&mut self, n: &Notification) {
        info!(title = %n.title, text = %n.text, actions = ?n.actions, "notification");
    }

    fn remove(&mut self) {
        info!("notification removed");
    }
}

/// Keeps the sink in step with the session, touching it only on change.
pub struct Notifier {
    sink: Box<dyn NotificationSink>,
    settings: NotificationSettings,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(sink: Box<dyn NotificationSink>, settings: NotificationSettings) -> Self {
        Self {
            sink,
            settings,
            current: None,
        }
    }

    pub fn update(&mut self, status: PlaybackStatus, track: &TrackRecord) {
        let next = notification_for(status, track, &self.settings);
        if next == self.current {
            return;
        }
        match &next {
            Some(n) => self.sink.show(n),
            None => self.sink.remove(),
        }
        self.current = next;
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Box::new(LogSink), NotificationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::library::tests::track;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Option<Notification>>>>);

    impl NotificationSink for Recorder {
        fn show(&mut self, n: &Notification) {
            self.0.lock().unwrap().push(Some(n.clone()));
        }

        fn remove(&mut self) {
            self.0.lock().unwrap().push(None);
        }
    }

    #[test]
    fn playing_track_shows_pause_action() {
        let t = track("1", "Song One", "Alpha", "X", 1);
        let n = notification_for(PlaybackStatus::Playing, &t, &NotificationSettings::default()).unwrap();
        assert_eq!(n.title, "Song One");
        assert_eq!(n.text, "X - Alpha");
        assert_eq!(
            n.actions,
            [
                NotificationAction::Previous,
                NotificationAction::Pause,
                NotificationAction::Next
            ]
        );

        let n = notification_for(PlaybackStatus::Paused, &t, &NotificationSettings::default()).unwrap();
        assert_eq!(n.actions[1], NotificationAction::Play);
    }

    #[test]
    fn stopped_idle_or_nothing_playing_has_no_notification() {
        let t = track("1", "Song One", "Alpha", "X", 1);
        let settings = NotificationSettings::default();
        assert!(notification_for(PlaybackStatus::Stopped, &t, &settings).is_none());
        assert!(notification_for(PlaybackStatus::Idle, &t, &settings).is_none());
        assert!(notification_for(PlaybackStatus::Playing, &TrackRecord::nothing(), &settings).is_none());
    }

    #[test]
    fn notifier_only_touches_sink_on_change() {
        let rec = Recorder::default();
        let mut notifier = Notifier::new(Box::new(rec.clone()), NotificationSettings::default());
        let t = track("1", "Song One", "Alpha", "X", 1);

        notifier.update(PlaybackStatus::Preparing, &t);
        notifier.update(PlaybackStatus::Playing, &t);
        notifier.update(PlaybackStatus::Paused, &t);
        notifier.update(PlaybackStatus::Stopped, &t);
        notifier.update(PlaybackStatus::Idle, &t);

        let log = rec.0.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].as_ref().unwrap().actions[1], NotificationAction::Pause);
        assert_eq!(log[1].as_ref().unwrap().actions[1], NotificationAction::Play);
        assert!(log[2].is_none());
        assert!(notifier.current().is_none());
    }
}
