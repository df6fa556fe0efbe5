//! Persistent desktop notification for the current track.
//!
//! Talks to `org.freedesktop.Notifications` from a worker thread so the
//! session host never waits on D-Bus.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use zbus::blocking::Connection;
use zbus::proxy;
use zvariant::Value;

use crate::catalog::SharedCatalog;
use crate::session::{PlaybackState, SessionObserver, SessionSnapshot};

const APP_NAME: &str = "cadenza";

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub summary: String,
    pub body: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Note {
    Show(NotificationContent),
    Close,
}

/// What a snapshot means for the notification.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Show(NotificationContent),
    Close,
    /// Transitional states leave whatever is on screen alone.
    Keep,
}

fn decide(snapshot: &SessionSnapshot, catalog: &SharedCatalog) -> Decision {
    match snapshot.state {
        PlaybackState::Connecting | PlaybackState::Buffering => Decision::Keep,
        PlaybackState::Idle | PlaybackState::Stopped | PlaybackState::Error(_) => Decision::Close,
        PlaybackState::Playing | PlaybackState::Paused => {
            let Some(track) = snapshot
                .current_track
                .as_ref()
                .and_then(|id| catalog.resolve(id).ok())
            else {
                return Decision::Close;
            };

            let paused = snapshot.state == PlaybackState::Paused;
            let mut body = [track.artist.as_deref(), track.album.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" - ");
            if paused {
                if !body.is_empty() {
                    body.push(' ');
                }
                body.push_str("(paused)");
            }
            let icon = match &track.artwork {
                Some(path) => path.display().to_string(),
                None if paused => "media-playback-pause".to_string(),
                None => "media-playback-start".to_string(),
            };

            Decision::Show(NotificationContent {
                summary: track.title.clone(),
                body,
                icon,
            })
        }
    }
}

pub struct NotificationObserver {
    tx: Sender<Note>,
    catalog: SharedCatalog,
    shown: Option<NotificationContent>,
}

impl NotificationObserver {
    /// Start the notification worker.
    pub fn spawn(catalog: SharedCatalog) -> Self {
        let (tx, rx) = mpsc::channel::<Note>();
        let spawned = thread::Builder::new()
            .name("cadenza-notify".into())
            .spawn(move || run_worker(&rx));
        if let Err(e) = spawned {
            tracing::error!(error = %e, "notifications: failed to spawn worker");
        }
        Self::with_sender(tx, catalog)
    }

    fn with_sender(tx: Sender<Note>, catalog: SharedCatalog) -> Self {
        Self {
            tx,
            catalog,
            shown: None,
        }
    }

    fn close(&mut self) {
        if self.shown.take().is_some() {
            let _ = self.tx.send(Note::Close);
        }
    }
}

impl SessionObserver for NotificationObserver {
    fn on_snapshot(&mut self, snapshot: &SessionSnapshot) {
        match decide(snapshot, &self.catalog) {
            Decision::Keep => {}
            Decision::Close => self.close(),
            Decision::Show(content) => {
                if self.shown.as_ref() != Some(&content) {
                    self.shown = Some(content.clone());
                    let _ = self.tx.send(Note::Show(content));
                }
            }
        }
    }

    fn on_active_changed(&mut self, _active: bool) {}

    fn on_shutdown(&mut self) {
        self.close();
    }
}

fn run_worker(rx: &Receiver<Note>) {
    let proxy = match Connection::session().and_then(|c| NotificationsProxyBlocking::new(&c)) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "notifications: no session bus, disabled");
            return;
        }
    };

    let mut current: Option<u32> = None;
    for note in rx.iter() {
        match note {
            Note::Show(content) => {
                let mut hints = HashMap::new();
                hints.insert("resident", Value::from(true));
                match proxy.notify(
                    APP_NAME,
                    current.unwrap_or(0),
                    &content.icon,
                    &content.summary,
                    &content.body,
                    &[],
                    hints,
                    0,
                ) {
                    Ok(id) => current = Some(id),
                    Err(e) => tracing::warn!(error = %e, "notifications: Notify failed"),
                }
            }
            Note::Close => {
                if let Some(id) = current.take() {
                    if let Err(e) = proxy.close_notification(id) {
                        tracing::debug!(error = %e, "notifications: close failed");
                    }
                }
            }
        }
    }
}
