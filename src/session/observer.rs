use std::sync::mpsc::Sender;

use crate::catalog::TrackId;

use super::types::SessionSnapshot;

/// Receives the session's outward signals, in transition order.
///
/// Observers run on the host thread, so implementations must hand slow work
/// (D-Bus calls, rendering) to their own thread.
pub trait SessionObserver: Send {
    fn on_snapshot(&mut self, snapshot: &SessionSnapshot);

    /// The keepalive requirement flipped.
    fn on_active_changed(&mut self, active: bool);

    fn on_track_finished(&mut self, _track: &TrackId) {}

    /// The host is going away; no further calls follow.
    fn on_shutdown(&mut self) {}
}

/// Everything an observer can be told, as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Snapshot(SessionSnapshot),
    ActiveChanged(bool),
    TrackFinished(TrackId),
    Shutdown,
}

impl SessionObserver for Sender<ObserverEvent> {
    fn on_snapshot(&mut self, snapshot: &SessionSnapshot) {
        let _ = self.send(ObserverEvent::Snapshot(snapshot.clone()));
    }

    fn on_active_changed(&mut self, active: bool) {
        let _ = self.send(ObserverEvent::ActiveChanged(active));
    }

    fn on_track_finished(&mut self, track: &TrackId) {
        let _ = self.send(ObserverEvent::TrackFinished(track.clone()));
    }

    fn on_shutdown(&mut self) {
        let _ = self.send(ObserverEvent::Shutdown);
    }
}

/// Logs every signal at `info`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_snapshot(&mut self, snapshot: &SessionSnapshot) {
        match &snapshot.current_track {
            Some(id) => tracing::info!(track = %id, state = %snapshot.state, "now"),
            None => tracing::info!(state = %snapshot.state, "now"),
        }
    }

    fn on_active_changed(&mut self, active: bool) {
        tracing::info!(active, "keepalive requirement changed");
    }

    fn on_track_finished(&mut self, track: &TrackId) {
        tracing::info!(track = %track, "track finished");
    }
}
