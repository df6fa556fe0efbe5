use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Opaque identifier of a track, unique within a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Immutable track metadata plus the locator the engine plays from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    /// Zero when the duration could not be read.
    pub duration_ms: u64,
    pub artwork: Option<PathBuf>,
    pub source: PathBuf,
}

impl Track {
    /// `Artist - Title`, or just the title when no artist is known.
    pub fn display(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{} - {}", a, self.title),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("track not found: {0}")]
    NotFound(TrackId),
}

/// Read-only access to the tracks a session may play.
pub trait MediaCatalog: Send + Sync {
    /// Look up a track by id.
    ///
    /// # Errors
    /// Returns [`CatalogError::NotFound`] for ids the catalog does not know.
    fn resolve(&self, id: &TrackId) -> Result<&Track, CatalogError>;

    /// Every track, in playback order.
    fn list_all(&self) -> Vec<Track>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the track whose source locator is `path`.
    fn find_by_source(&self, path: &Path) -> Option<&Track>;
}

pub type SharedCatalog = Arc<dyn MediaCatalog>;

/// In-memory catalog keyed by id, ordered as constructed.
#[derive(Debug, Default)]
pub struct Library {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
}

impl Library {
    /// Build a library from `tracks`. Later duplicates of an id are dropped.
    pub fn new(tracks: Vec<Track>) -> Self {
        let mut kept = Vec::with_capacity(tracks.len());
        let mut by_id = HashMap::with_capacity(tracks.len());
        for track in tracks {
            if by_id.contains_key(&track.id) {
                tracing::warn!(id = %track.id, "duplicate track id, keeping the first one");
                continue;
            }
            by_id.insert(track.id.clone(), kept.len());
            kept.push(track);
        }
        Self {
            tracks: kept,
            by_id,
        }
    }

    pub fn into_shared(self) -> SharedCatalog {
        Arc::new(self)
    }
}

impl MediaCatalog for Library {
    fn resolve(&self, id: &TrackId) -> Result<&Track, CatalogError> {
        self.by_id
            .get(id)
            .map(|&i| &self.tracks[i])
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    fn list_all(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn find_by_source(&self, path: &Path) -> Option<&Track> {
        self.tracks.iter().find(|t| t.source == path)
    }
}
