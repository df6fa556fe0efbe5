//! MPRIS D-Bus surface: exposes the session to desktop media controls and
//! forwards their method calls as [`ControlCmd`]s.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use async_io::block_on;
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::catalog::{SharedCatalog, Track, TrackId};
use crate::session::{PlaybackState, SessionObserver, SessionSnapshot};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.cadenza";
const TRACK_PATH_PREFIX: &str = "/org/cadenza/track/";

/// Transport commands from the outside world (MPRIS, console).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    PlayFromId(String),
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    List,
    Status,
    Quit,
}

/// Which properties changed since the last emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Changed {
    playback: bool,
    metadata: bool,
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackState,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    genre: Vec<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<OwnedObjectPath>,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<Changed>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: PlaybackState) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = playback;
        }
        let _ = self.notify.send(Changed {
            playback: true,
            metadata: false,
        });
    }

    pub fn set_track_metadata(&self, track: Option<&Track>) {
        if let Ok(mut s) = self.state.lock() {
            match track {
                Some(t) => {
                    s.title = Some(t.title.clone());
                    s.artist = t.artist.iter().cloned().collect();
                    s.album = t.album.clone();
                    s.genre = t.genre.iter().cloned().collect();
                    s.url = Some(file_url(&t.source));
                    s.art_url = t.artwork.as_ref().map(|p| file_url(p));
                    s.length_micros = i64::try_from(t.duration_ms)
                        .ok()
                        .and_then(|ms| ms.checked_mul(1000))
                        .filter(|us| *us > 0);
                    s.track_id = track_object_path(&t.id);
                }
                None => {
                    s.title = None;
                    s.artist.clear();
                    s.album = None;
                    s.genre.clear();
                    s.url = None;
                    s.art_url = None;
                    s.length_micros = None;
                    s.track_id = None;
                }
            }
        }
        let _ = self.notify.send(Changed {
            playback: false,
            metadata: true,
        });
    }
}

/// `file://` URL for `path`, escaping every byte outside the unreserved set
/// and `/`; [`percent_decode`] reverses it.
fn file_url(path: &std::path::Path) -> String {
    let mut url = String::from("file://");
    for &b in path.as_os_str().as_encoded_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'/' | b'-' | b'.' | b'_' | b'~') {
            url.push(char::from(b));
        } else {
            url.push_str(&format!("%{b:02X}"));
        }
    }
    url
}

/// D-Bus object paths only allow `[A-Za-z0-9_]` per element, so anything
/// else in the id is written as `_xx` hex.
fn track_object_path(id: &TrackId) -> Option<OwnedObjectPath> {
    let mut path = String::from(TRACK_PATH_PREFIX);
    for b in id.as_str().bytes() {
        if b.is_ascii_alphanumeric() {
            path.push(char::from(b));
        } else {
            path.push_str(&format!("_{b:02x}"));
        }
    }
    if path.len() == TRACK_PATH_PREFIX.len() {
        path.push('_');
    }
    OwnedObjectPath::try_from(path).ok()
}

/// Map an `OpenUri` argument onto a catalog id: `file://` URIs are looked up
/// by source path, anything else is taken as a track id.
fn resolve_open_uri(catalog: &SharedCatalog, uri: &str) -> Option<TrackId> {
    match uri.strip_prefix("file://") {
        Some(rest) => {
            let path = PathBuf::from(percent_decode(rest));
            catalog.find_by_source(&path).map(|t| t.id.clone())
        }
        None => {
            let id = TrackId::from(uri);
            catalog.resolve(&id).ok().map(|t| t.id.clone())
        }
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Headless.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "cadenza"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    catalog: SharedCatalog,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn open_uri(&self, uri: &str) {
        match resolve_open_uri(&self.catalog, uri) {
            Some(id) => {
                let _ = self.tx.send(ControlCmd::PlayFromId(id.to_string()));
            }
            None => tracing::warn!(uri, "MPRIS: OpenUri for a track not in the library"),
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlaybackState::Connecting | PlaybackState::Buffering | PlaybackState::Playing => {
                "Playing"
            }
            PlaybackState::Paused => "Paused",
            PlaybackState::Idle | PlaybackState::Stopped | PlaybackState::Error(_) => "Stopped",
        }
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut put = |key: &str, value: Value<'_>| {
            if let Ok(v) = OwnedValue::try_from(value) {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(path) = &s.track_id {
            put("mpris:trackid", Value::from(path.clone().into_inner()));
        }
        if let Some(title) = &s.title {
            put("xesam:title", Value::from(title.clone()));
        }
        if !s.artist.is_empty() {
            put("xesam:artist", Value::from(s.artist.clone()));
        }
        if let Some(album) = &s.album {
            put("xesam:album", Value::from(album.clone()));
        }
        if !s.genre.is_empty() {
            put("xesam:genre", Value::from(s.genre.clone()));
        }
        if let Some(url) = &s.url {
            put("xesam:url", Value::from(url.clone()));
        }
        if let Some(art) = &s.art_url {
            put("mpris:artUrl", Value::from(art.clone()));
        }
        if let Some(len) = s.length_micros {
            put("mpris:length", Value::from(len));
        }
        map
    }
}

/// Keeps the MPRIS properties in step with the session.
pub struct MprisObserver {
    handle: MprisHandle,
    catalog: SharedCatalog,
    last: Option<SessionSnapshot>,
}

impl MprisObserver {
    pub fn new(handle: MprisHandle, catalog: SharedCatalog) -> Self {
        Self {
            handle,
            catalog,
            last: None,
        }
    }
}

impl SessionObserver for MprisObserver {
    fn on_snapshot(&mut self, snapshot: &SessionSnapshot) {
        let prev = self.last.replace(snapshot.clone());
        let track_changed = prev
            .as_ref()
            .is_none_or(|p| p.current_track != snapshot.current_track);
        let state_changed = prev.as_ref().is_none_or(|p| p.state != snapshot.state);

        if track_changed {
            let track = snapshot
                .current_track
                .as_ref()
                .and_then(|id| self.catalog.resolve(id).ok());
            self.handle.set_track_metadata(track);
        }
        if state_changed {
            self.handle.set_playback(snapshot.state.clone());
        }
    }

    fn on_active_changed(&mut self, _active: bool) {}
}

/// Start the MPRIS server on its own thread.
///
/// Failure to reach the session bus is logged and leaves the handle inert.
pub fn spawn_mpris(tx: Sender<ControlCmd>, catalog: SharedCatalog) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<Changed>();

    let state_for_thread = state.clone();
    let spawned = thread::Builder::new()
        .name("cadenza-mpris".into())
        .spawn(move || {
            let player = PlayerIface {
                tx: tx.clone(),
                state: state_for_thread,
                catalog,
            };
            let Some((_connection, iface)) = block_on(serve(RootIface { tx }, player)) else {
                return;
            };
            emit_changes(&iface, &notify_rx);
        });

    if let Err(e) = spawned {
        tracing::error!(error = %e, "MPRIS: failed to spawn thread");
    }

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

async fn serve(
    root: RootIface,
    player: PlayerIface,
) -> Option<(Connection, InterfaceRef<PlayerIface>)> {
    let connection = match Connection::session().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "MPRIS: failed to connect to session bus");
            return None;
        }
    };

    if let Err(e) = connection.request_name(BUS_NAME).await {
        tracing::warn!(error = %e, "MPRIS: failed to acquire name");
        return None;
    }

    let object_server = connection.object_server();

    if let Err(e) = object_server.at(OBJECT_PATH, root).await {
        tracing::warn!(error = %e, "MPRIS: failed to register root iface");
        return None;
    }

    if let Err(e) = object_server.at(OBJECT_PATH, player).await {
        tracing::warn!(error = %e, "MPRIS: failed to register player iface");
        return None;
    }

    match object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await
    {
        Ok(iface) => {
            tracing::info!(name = BUS_NAME, "MPRIS: serving");
            Some((connection, iface))
        }
        Err(e) => {
            tracing::warn!(error = %e, "MPRIS: player iface vanished");
            None
        }
    }
}

/// Emit `PropertiesChanged` until every handle is dropped.
fn emit_changes(iface: &InterfaceRef<PlayerIface>, notify_rx: &Receiver<Changed>) {
    while let Ok(first) = notify_rx.recv() {
        let mut changed = first;
        for more in notify_rx.try_iter() {
            changed.playback |= more.playback;
            changed.metadata |= more.metadata;
        }

        block_on(async {
            let emitter = iface.signal_emitter();
            let player = iface.get().await;
            if changed.playback {
                if let Err(e) = player.playback_status_changed(emitter).await {
                    tracing::debug!(error = %e, "MPRIS: PlaybackStatus signal failed");
                }
            }
            if changed.metadata {
                if let Err(e) = player.metadata_changed(emitter).await {
                    tracing::debug!(error = %e, "MPRIS: Metadata signal failed");
                }
            }
        });
    }
    tracing::debug!("MPRIS: handle dropped, leaving the bus");
}
