use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lofty::prelude::*;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{Library, Track, TrackId};

pub(super) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Relative path without extension, `/`-separated on every platform.
pub(super) fn track_id_for(root: &Path, path: &Path) -> TrackId {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    TrackId::new(parts.join("/"))
}

fn find_artwork(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .map(|n| dir.join(n))
        .find(|candidate| candidate.is_file())
}

fn non_empty(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_track(root: &Path, path: &Path, artwork: Option<PathBuf>) -> Track {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = None;
    let mut album = None;
    let mut genre = None;
    let mut duration_ms = 0;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            duration_ms = tagged.properties().duration().as_millis() as u64;

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(t) = non_empty(tag.title()) {
                    title = t;
                }
                artist = non_empty(tag.artist());
                album = non_empty(tag.album());
                genre = non_empty(tag.genre());
            }
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no readable tags");
        }
    }

    Track {
        id: track_id_for(root, path),
        title,
        artist,
        album,
        genre,
        duration_ms,
        artwork,
        source: path.to_path_buf(),
    }
}

/// Scan `dir` for audio files and build a [`Library`] ordered by track id.
///
/// Relative directories are resolved first so every source and artwork path
/// in the library is absolute.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Library {
    let dir = match dir.canonicalize() {
        Ok(abs) => abs,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot resolve music directory");
            return Library::new(Vec::new());
        }
    };
    let dir = dir.as_path();
    let mut tracks: Vec<Track> = Vec::new();
    let mut artwork_by_dir: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let artwork = match path.parent() {
            Some(parent) => artwork_by_dir
                .entry(parent.to_path_buf())
                .or_insert_with(|| find_artwork(parent, &settings.artwork_names))
                .clone(),
            None => None,
        };

        tracks.push(read_track(dir, path, artwork));
    }

    tracks.sort_by(|a, b| {
        a.id.as_str()
            .to_lowercase()
            .cmp(&b.id.as_str().to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    tracing::info!(dir = %dir.display(), tracks = tracks.len(), "library scanned");
    Library::new(tracks)
}
