//! Value types shared by the session, its host and the observers.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::{CatalogError, TrackId};

/// Monotonic counter attached to each engine load request.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Connecting,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Error(String),
}

impl PlaybackState {
    /// Whether this state keeps the process resident.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Buffering | Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Buffering => f.write_str("buffering"),
            Self::Playing => f.write_str("playing"),
            Self::Paused => f.write_str("paused"),
            Self::Stopped => f.write_str("stopped"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// What observers see after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub current_track: Option<TrackId>,
    pub state: PlaybackState,
}

/// Commands the session asks the host to forward to the audio engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Load {
        generation: Generation,
        source: PathBuf,
    },
    Play,
    Pause,
    Stop,
}

/// Ordered output of a single transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Snapshot(SessionSnapshot),
    Active(bool),
    Engine(EngineCommand),
    TrackFinished(TrackId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEventKind {
    Buffering,
    Playing,
    Completed,
    Error(String),
}

/// Asynchronous engine callback, tagged with the load it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEvent {
    pub generation: Generation,
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn new(generation: Generation, kind: EngineEventKind) -> Self {
        Self { generation, kind }
    }
}

/// Command-level failures. These never change the session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("track not found: {0}")]
    NotFound(TrackId),
    #[error("no current track to resume")]
    NoCurrentTrack,
    #[error("session host is not running")]
    Closed,
}

impl From<CatalogError> for SessionError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(id) => Self::NotFound(id),
        }
    }
}
