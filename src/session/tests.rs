use std::path::PathBuf;

use super::*;
use crate::catalog::{Library, SharedCatalog, Track, TrackId};

fn t(id: &str) -> Track {
    Track {
        id: TrackId::from(id),
        title: id.to_string(),
        artist: None,
        album: None,
        genre: None,
        duration_ms: 1000,
        artwork: None,
        source: PathBuf::from(format!("/music/{id}.mp3")),
    }
}

fn catalog() -> SharedCatalog {
    Library::new(vec![t("T1"), t("T2"), t("T3")]).into_shared()
}

fn session() -> PlaybackSession {
    PlaybackSession::new(catalog())
}

fn snap(id: Option<&str>, state: PlaybackState) -> Signal {
    Signal::Snapshot(SessionSnapshot {
        current_track: id.map(TrackId::from),
        state,
    })
}

fn load(generation: Generation, id: &str) -> Signal {
    Signal::Engine(EngineCommand::Load {
        generation,
        source: PathBuf::from(format!("/music/{id}.mp3")),
    })
}

fn snapshots(signals: &[Signal]) -> Vec<SessionSnapshot> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::Snapshot(snap) => Some(snap.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn new_session_is_idle_with_catalog_queue() {
    let s = session();
    assert_eq!(s.state(), &PlaybackState::Idle);
    assert_eq!(s.current_track(), None);
    let ids: Vec<&str> = s.queue().iter().map(TrackId::as_str).collect();
    assert_eq!(ids, vec!["T1", "T2", "T3"]);
}

#[test]
fn shuffled_queue_keeps_membership() {
    let s = PlaybackSession::shuffled(catalog());
    let mut ids: Vec<String> = s.queue().iter().map(|t| t.to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["T1", "T2", "T3"]);
}

#[test]
fn play_from_id_commits_then_emits_then_commands_engine() {
    let mut s = session();
    let signals = s.play_from_id(&TrackId::from("T1")).unwrap();
    assert_eq!(
        signals,
        vec![
            snap(Some("T1"), PlaybackState::Connecting),
            Signal::Active(true),
            load(1, "T1"),
            Signal::Engine(EngineCommand::Play),
        ]
    );
    assert_eq!(s.cursor(), Some(0));
}

#[test]
fn play_from_unknown_id_is_not_found_and_silent() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T2")).unwrap();
    s.on_playing(1);
    let before = s.snapshot();

    let err = s.play_from_id(&TrackId::from("unknown")).unwrap_err();
    assert_eq!(err, SessionError::NotFound(TrackId::from("unknown")));
    assert_eq!(s.snapshot(), before);
    assert_eq!(s.generation(), 1);
}

#[test]
fn engine_callbacks_walk_connecting_buffering_playing() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();

    assert_eq!(
        s.on_buffering(1),
        vec![snap(Some("T1"), PlaybackState::Buffering), Signal::Active(true)]
    );
    assert_eq!(
        s.on_playing(1),
        vec![snap(Some("T1"), PlaybackState::Playing), Signal::Active(true)]
    );
    // Buffering is only meaningful while connecting.
    assert!(s.on_buffering(1).is_empty());
    assert_eq!(s.state(), &PlaybackState::Playing);
}

#[test]
fn superseded_generation_callbacks_are_ignored() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.play_from_id(&TrackId::from("T2")).unwrap();
    assert_eq!(s.generation(), 2);

    assert!(s.on_playing(1).is_empty());
    assert!(s.on_completion(1).is_empty());
    assert!(s.on_error(1, "late").is_empty());
    assert_eq!(
        s.snapshot(),
        SessionSnapshot {
            current_track: Some(TrackId::from("T2")),
            state: PlaybackState::Connecting,
        }
    );

    s.on_playing(2);
    assert_eq!(s.state(), &PlaybackState::Playing);
}

#[test]
fn pause_only_from_active_states() {
    let mut s = session();
    assert!(s.pause().is_empty());

    s.play_from_id(&TrackId::from("T1")).unwrap();
    assert_eq!(
        s.pause(),
        vec![
            snap(Some("T1"), PlaybackState::Paused),
            Signal::Active(false),
            Signal::Engine(EngineCommand::Pause),
        ]
    );
    assert!(s.pause().is_empty());

    s.stop();
    assert!(s.pause().is_empty());
    assert_eq!(s.state(), &PlaybackState::Stopped);
}

/// A session driven into one of the seven states, by index.
fn session_in(state: usize) -> PlaybackSession {
    let mut s = session();
    if state == 0 {
        return s;
    }
    s.play_from_id(&TrackId::from("T1")).unwrap();
    match state {
        1 => {}
        2 => {
            s.on_buffering(1);
        }
        3 => {
            s.on_playing(1);
        }
        4 => {
            s.pause();
        }
        5 => {
            s.stop();
        }
        _ => {
            s.on_error(1, "boom");
        }
    }
    s
}

#[test]
fn stop_from_every_state_lands_in_stopped_and_goes_inactive() {
    for state in 0..7 {
        let mut s = session_in(state);
        let track = s.current_track().cloned();
        let signals = s.stop();
        assert_eq!(s.state(), &PlaybackState::Stopped, "from state #{state}");
        assert_eq!(s.current_track(), track.as_ref());
        assert!(signals.contains(&Signal::Active(false)));
        assert_eq!(signals.last(), Some(&Signal::Engine(EngineCommand::Stop)));
    }
}

#[test]
fn error_is_reachable_from_every_state() {
    for state in 0..7 {
        let mut s = session_in(state);
        let generation = s.generation();
        s.on_error(generation, "device lost");
        assert_eq!(s.state(), &PlaybackState::Error("device lost".into()));
    }
}

#[test]
fn stop_mid_load_makes_the_load_callbacks_stale() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.stop();
    assert!(s.on_playing(1).is_empty());
    assert!(s.on_error(1, "late").is_empty());
    assert_eq!(s.state(), &PlaybackState::Stopped);
}

#[test]
fn play_current_requires_a_track() {
    let mut s = session();
    assert_eq!(s.play_current(), Err(SessionError::NoCurrentTrack));
    assert_eq!(s.state(), &PlaybackState::Idle);
}

#[test]
fn play_current_resumes_a_paused_load_without_reloading() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.on_playing(1);
    s.pause();

    let signals = s.play_current().unwrap();
    assert_eq!(
        signals,
        vec![
            snap(Some("T1"), PlaybackState::Connecting),
            Signal::Active(true),
            Signal::Engine(EngineCommand::Play),
        ]
    );
    assert_eq!(s.generation(), 1);
    s.on_playing(1);
    assert_eq!(s.state(), &PlaybackState::Playing);
}

#[test]
fn play_current_reloads_after_stop_or_release() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.stop();
    let signals = s.play_current().unwrap();
    assert!(signals.contains(&load(3, "T1")));

    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.pause();
    s.engine_released();
    let signals = s.play_current().unwrap();
    assert!(signals.contains(&load(2, "T1")));
}

#[test]
fn play_current_while_active_is_a_no_op() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    assert_eq!(s.play_current(), Ok(Vec::new()));
}

#[test]
fn completion_stops_and_reports_the_finished_track() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    // Completion before playing is not in the table.
    assert!(s.on_completion(1).is_empty());

    s.on_playing(1);
    assert_eq!(
        s.on_completion(1),
        vec![
            snap(Some("T1"), PlaybackState::Stopped),
            Signal::Active(false),
            Signal::TrackFinished(TrackId::from("T1")),
        ]
    );
    // No auto-advance inside the state machine.
    assert_eq!(s.current_track(), Some(&TrackId::from("T1")));
}

#[test]
fn engine_error_is_terminal_until_a_new_play_or_stop() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.on_playing(1);

    assert_eq!(
        s.on_error(1, "decoder exploded"),
        vec![
            snap(Some("T1"), PlaybackState::Error("decoder exploded".into())),
            Signal::Active(false),
        ]
    );
    assert!(s.pause().is_empty());
    assert!(s.on_playing(1).is_empty());
    assert_eq!(s.state(), &PlaybackState::Error("decoder exploded".into()));

    s.play_current().unwrap();
    assert_eq!(s.state(), &PlaybackState::Connecting);
}

#[test]
fn skip_moves_cursor_and_loads_without_wrapping() {
    let mut s = session();
    // No cursor yet: next selects the first entry.
    let signals = s.skip_next().unwrap();
    assert_eq!(
        snapshots(&signals),
        vec![SessionSnapshot {
            current_track: Some(TrackId::from("T1")),
            state: PlaybackState::Connecting,
        }]
    );

    s.skip_next().unwrap();
    s.skip_next().unwrap();
    assert_eq!(s.current_track(), Some(&TrackId::from("T3")));
    let generation = s.generation();

    // Last entry: cursor stays, activity is re-announced, nothing loads.
    assert_eq!(s.skip_next().unwrap(), vec![Signal::Active(true)]);
    assert_eq!(s.generation(), generation);
    assert_eq!(s.cursor(), Some(2));

    s.skip_previous().unwrap();
    assert_eq!(s.current_track(), Some(&TrackId::from("T2")));
}

#[test]
fn skip_at_the_front_while_paused_only_reports_inactivity() {
    let mut s = session();
    assert_eq!(s.skip_previous().unwrap(), vec![Signal::Active(false)]);

    s.play_from_id(&TrackId::from("T1")).unwrap();
    s.pause();
    assert_eq!(s.skip_previous().unwrap(), vec![Signal::Active(false)]);
    assert_eq!(s.state(), &PlaybackState::Paused);
}

#[test]
fn skip_on_empty_queue_is_an_edge() {
    let mut s = PlaybackSession::new(Library::new(Vec::new()).into_shared());
    assert_eq!(s.skip_next().unwrap(), vec![Signal::Active(false)]);
    assert_eq!(s.skip_previous().unwrap(), vec![Signal::Active(false)]);
}

#[test]
fn play_from_id_moves_the_cursor_for_later_skips() {
    let mut s = session();
    s.play_from_id(&TrackId::from("T2")).unwrap();
    s.skip_next().unwrap();
    assert_eq!(s.current_track(), Some(&TrackId::from("T3")));
}

#[test]
fn activity_follows_state() {
    assert!(!PlaybackState::Idle.is_active());
    assert!(PlaybackState::Connecting.is_active());
    assert!(PlaybackState::Buffering.is_active());
    assert!(PlaybackState::Playing.is_active());
    assert!(!PlaybackState::Paused.is_active());
    assert!(!PlaybackState::Stopped.is_active());
    assert!(!PlaybackState::Error("x".into()).is_active());
}
