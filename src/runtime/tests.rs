use std::path::{Path, PathBuf};
use std::time::Duration;

use super::console::parse_command;
use super::*;
use crate::catalog::{Library, Track, TrackId};
use crate::config::AdvancePolicy;
use crate::engine::AudioEngine;
use crate::session::{Generation, PlaybackState, ProcessLifecycle};

struct SilentEngine;

impl AudioEngine for SilentEngine {
    fn load(&mut self, _generation: Generation, _source: &Path) {}
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
    fn is_playing(&self) -> bool {
        false
    }
}

struct NoopLifecycle;

impl ProcessLifecycle for NoopLifecycle {
    fn request_keepalive(&mut self) {}
    fn release_keepalive(&mut self) {}
}

fn catalog() -> SharedCatalog {
    Library::new(vec![
        Track {
            id: TrackId::from("a/one"),
            title: "One".into(),
            artist: Some("Band".into()),
            album: None,
            genre: None,
            duration_ms: 125_000,
            artwork: None,
            source: PathBuf::from("/music/a/one.flac"),
        },
        Track {
            id: TrackId::from("b/two"),
            title: "Two".into(),
            artist: None,
            album: None,
            genre: None,
            duration_ms: 0,
            artwork: None,
            source: PathBuf::from("/music/b/two.flac"),
        },
    ])
    .into_shared()
}

fn host(catalog: &SharedCatalog) -> SessionHandle {
    SessionHost::spawn(
        PlaybackSession::new(catalog.clone()),
        HostOptions {
            idle_timeout: Duration::from_secs(60),
            advance: AdvancePolicy::Stop,
            fade_out: Duration::ZERO,
        },
        |_events| Box::new(SilentEngine),
        Box::new(NoopLifecycle),
        Vec::new(),
    )
}

fn run(cmd: ControlCmd, handle: &SessionHandle, catalog: &SharedCatalog) -> (Flow, String) {
    let mut out = Vec::new();
    let flow = dispatch(cmd, handle, catalog, &mut out);
    (flow, String::from_utf8(out).unwrap())
}

#[test]
fn console_lines_parse_to_commands() {
    assert_eq!(parse_command("play"), Some(ControlCmd::Play));
    assert_eq!(
        parse_command("  play  Artist/Album/01 Intro  "),
        Some(ControlCmd::PlayFromId("Artist/Album/01 Intro".into()))
    );
    assert_eq!(parse_command("PAUSE"), Some(ControlCmd::Pause));
    assert_eq!(parse_command("toggle"), Some(ControlCmd::PlayPause));
    assert_eq!(parse_command("stop"), Some(ControlCmd::Stop));
    assert_eq!(parse_command("n"), Some(ControlCmd::Next));
    assert_eq!(parse_command("previous"), Some(ControlCmd::Prev));
    assert_eq!(parse_command("ls"), Some(ControlCmd::List));
    assert_eq!(parse_command("status"), Some(ControlCmd::Status));
    assert_eq!(parse_command("q"), Some(ControlCmd::Quit));
    assert_eq!(parse_command(""), None);
    assert_eq!(parse_command("dance"), None);
}

#[test]
fn play_without_a_current_track_starts_the_queue() {
    let catalog = catalog();
    let handle = host(&catalog);

    assert_eq!(run(ControlCmd::Play, &handle, &catalog).0, Flow::Continue);
    let snap = handle.snapshot().unwrap();
    assert_eq!(snap.current_track, Some(TrackId::from("a/one")));
    assert_eq!(snap.state, PlaybackState::Connecting);

    run(ControlCmd::PlayPause, &handle, &catalog);
    assert_eq!(handle.snapshot().unwrap().state, PlaybackState::Paused);
    handle.shutdown();
}

#[test]
fn failed_commands_are_reported_and_the_loop_goes_on() {
    let catalog = catalog();
    let handle = host(&catalog);

    let (flow, out) = run(ControlCmd::PlayFromId("nope".into()), &handle, &catalog);
    assert_eq!(flow, Flow::Continue);
    assert_eq!(out, "error: track not found: nope\n");
    handle.shutdown();
}

#[test]
fn list_and_status_write_to_the_console() {
    let catalog = catalog();
    let handle = host(&catalog);

    let (_, out) = run(ControlCmd::List, &handle, &catalog);
    assert_eq!(out, "a/one\tBand - One\t2:05\nb/two\tTwo\t0:00\n");

    let (_, out) = run(ControlCmd::Status, &handle, &catalog);
    assert_eq!(out, "idle\n");

    run(ControlCmd::PlayFromId("b/two".into()), &handle, &catalog);
    run(ControlCmd::Stop, &handle, &catalog);
    let (_, out) = run(ControlCmd::Status, &handle, &catalog);
    assert_eq!(out, "stopped: Two [b/two]\n");
    handle.shutdown();
}

#[test]
fn quit_and_a_closed_host_end_the_loop() {
    let catalog = catalog();
    let handle = host(&catalog);
    assert_eq!(run(ControlCmd::Quit, &handle, &catalog).0, Flow::Quit);

    handle.shutdown();
    assert_eq!(run(ControlCmd::Stop, &handle, &catalog).0, Flow::Quit);
}

#[test]
fn control_loop_drains_until_quit() {
    let catalog = catalog();
    let handle = host(&catalog);
    let (tx, rx) = mpsc::channel();
    for cmd in [
        ControlCmd::PlayFromId("a/one".into()),
        ControlCmd::Next,
        ControlCmd::Quit,
        ControlCmd::Stop,
    ] {
        tx.send(cmd).unwrap();
    }

    let mut out = Vec::new();
    control_loop(&rx, &handle, &catalog, &mut out);

    let snap = handle.snapshot().unwrap();
    assert_eq!(snap.current_track, Some(TrackId::from("b/two")));
    // The stop after the quit was never applied.
    assert_eq!(snap.state, PlaybackState::Connecting);
    handle.shutdown();
}
