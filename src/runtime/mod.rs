use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};

use clap::Parser;

use crate::catalog::{self, SharedCatalog};
use crate::config;
use crate::engine::RodioEngine;
use crate::mpris::{ControlCmd, MprisObserver};
use crate::notify::NotificationObserver;
use crate::session::{
    HostOptions, LogObserver, PlaybackSession, SessionError, SessionHandle, SessionHost,
    SessionSnapshot,
};

mod console;
mod lifecycle;
mod logging;
mod settings;

/// Background music player daemon.
#[derive(Parser, Debug)]
#[command(name = "cadenza", version, about)]
struct Args {
    /// Music directory to scan (defaults to the current directory)
    #[arg(env = "CADENZA_MUSIC_DIR")]
    dir: Option<PathBuf>,

    /// Start playing this track id right away
    #[arg(long, value_name = "ID")]
    play: Option<String>,

    /// Do not register on the session bus as an MPRIS player
    #[arg(long)]
    no_mpris: bool,

    /// Do not read commands from stdin
    #[arg(long)]
    no_console: bool,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = config::Settings::load();
    let filter = loaded
        .as_ref()
        .map(|s| s.logging.filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    logging::init(&filter)?;
    let settings = settings::settle(loaded);

    let dir = match args.dir {
        Some(d) => std::fs::canonicalize(d)?,
        None => std::env::current_dir()?,
    };
    let catalog = catalog::scan(&dir, &settings.library).into_shared();
    if catalog.is_empty() {
        tracing::warn!(dir = %dir.display(), "no playable files found");
    }

    let session = if settings.playback.shuffle {
        PlaybackSession::shuffled(catalog.clone())
    } else {
        PlaybackSession::new(catalog.clone())
    };

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();

    let residency = lifecycle::Residency::new(
        settings
            .service
            .exit_when_idle
            .then(|| control_tx.clone()),
    );

    let handle = SessionHost::spawn(
        session,
        HostOptions::from(&settings),
        |events| Box::new(RodioEngine::new(events)),
        Box::new(residency),
        vec![Box::new(LogObserver)],
    );

    if settings.service.mpris && !args.no_mpris {
        let mpris = crate::mpris::spawn_mpris(control_tx.clone(), catalog.clone());
        handle.subscribe(MprisObserver::new(mpris, catalog.clone()))?;
    }
    if settings.service.notifications {
        handle.subscribe(NotificationObserver::spawn(catalog.clone()))?;
    }

    if settings.service.console && !args.no_console {
        console::spawn(control_tx.clone());
    }
    if let Some(id) = args.play {
        let _ = control_tx.send(ControlCmd::PlayFromId(id));
    }
    drop(control_tx);

    tracing::info!(tracks = catalog.len(), dir = %dir.display(), "cadenza ready");
    control_loop(&control_rx, &handle, &catalog, &mut io::stdout());

    handle.shutdown();
    tracing::info!("bye");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Apply control commands until a quit or until every producer is gone.
fn control_loop(
    rx: &Receiver<ControlCmd>,
    handle: &SessionHandle,
    catalog: &SharedCatalog,
    out: &mut impl Write,
) {
    while let Ok(cmd) = rx.recv() {
        if dispatch(cmd, handle, catalog, out) == Flow::Quit {
            break;
        }
    }
}

fn dispatch(
    cmd: ControlCmd,
    handle: &SessionHandle,
    catalog: &SharedCatalog,
    out: &mut impl Write,
) -> Flow {
    tracing::debug!(?cmd, "control");
    let result = match cmd {
        ControlCmd::PlayFromId(id) => handle.play_from_id(id),
        // Nothing played yet: start at the head of the queue.
        ControlCmd::Play => match handle.play_current() {
            Err(SessionError::NoCurrentTrack) => handle.skip_next(),
            r => r,
        },
        ControlCmd::PlayPause => match handle.play_pause() {
            Err(SessionError::NoCurrentTrack) => handle.skip_next(),
            r => r,
        },
        ControlCmd::Pause => handle.pause(),
        ControlCmd::Stop => handle.stop(),
        ControlCmd::Next => handle.skip_next(),
        ControlCmd::Prev => handle.skip_previous(),
        ControlCmd::List => {
            write_list(out, catalog);
            Ok(())
        }
        ControlCmd::Status => handle
            .snapshot()
            .map(|snapshot| write_status(out, &snapshot, catalog)),
        ControlCmd::Quit => return Flow::Quit,
    };

    match result {
        Ok(()) => Flow::Continue,
        Err(SessionError::Closed) => {
            tracing::warn!("session host is gone");
            Flow::Quit
        }
        Err(e) => {
            let _ = writeln!(out, "error: {e}");
            Flow::Continue
        }
    }
}

fn write_list(out: &mut impl Write, catalog: &SharedCatalog) {
    for track in catalog.list_all() {
        let secs = track.duration_ms / 1000;
        let _ = writeln!(
            out,
            "{}\t{}\t{}:{:02}",
            track.id,
            track.display(),
            secs / 60,
            secs % 60
        );
    }
}

fn write_status(out: &mut impl Write, snapshot: &SessionSnapshot, catalog: &SharedCatalog) {
    let _ = match &snapshot.current_track {
        Some(id) => match catalog.resolve(id) {
            Ok(track) => writeln!(out, "{}: {} [{}]", snapshot.state, track.display(), id),
            Err(_) => writeln!(out, "{}: [{}]", snapshot.state, id),
        },
        None => writeln!(out, "{}", snapshot.state),
    };
}

#[cfg(test)]
mod tests;
