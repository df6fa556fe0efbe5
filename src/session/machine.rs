//! The playback state machine.
//!
//! `PlaybackSession` is plain data plus transitions: every operation commits
//! the new state first and then returns the signals it produced, in order.
//! It never calls the engine, the observers or the process lifecycle itself;
//! the host executes the returned [`Signal`]s.

use rand::seq::SliceRandom;

use crate::catalog::{SharedCatalog, TrackId};

use super::types::{
    EngineCommand, EngineEvent, EngineEventKind, Generation, PlaybackState, SessionError,
    SessionSnapshot, Signal,
};

pub struct PlaybackSession {
    catalog: SharedCatalog,
    queue: Vec<TrackId>,
    cursor: Option<usize>,
    current: Option<TrackId>,
    state: PlaybackState,
    generation: Generation,
    /// Generation the engine currently holds a source for, if any.
    loaded: Option<Generation>,
}

impl PlaybackSession {
    /// Create a session whose queue is the catalog's full listing.
    pub fn new(catalog: SharedCatalog) -> Self {
        let queue = catalog.list_all().into_iter().map(|t| t.id).collect();
        Self::with_queue(catalog, queue)
    }

    /// Like [`PlaybackSession::new`], with the queue shuffled once.
    pub fn shuffled(catalog: SharedCatalog) -> Self {
        let mut queue: Vec<TrackId> = catalog.list_all().into_iter().map(|t| t.id).collect();
        queue.shuffle(&mut rand::rng());
        Self::with_queue(catalog, queue)
    }

    pub fn with_queue(catalog: SharedCatalog, queue: Vec<TrackId>) -> Self {
        Self {
            catalog,
            queue,
            cursor: None,
            current: None,
            state: PlaybackState::Idle,
            generation: 0,
            loaded: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_track(&self) -> Option<&TrackId> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_track: self.current.clone(),
            state: self.state.clone(),
        }
    }

    /// Start `id` from the beginning, superseding any load in flight.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] when the catalog does not know `id`; the
    /// session is left untouched and no signal is produced.
    pub fn play_from_id(&mut self, id: &TrackId) -> Result<Vec<Signal>, SessionError> {
        let source = self.catalog.resolve(id)?.source.clone();
        if let Some(pos) = self.queue.iter().position(|q| q == id) {
            self.cursor = Some(pos);
        }
        self.current = Some(id.clone());
        Ok(self.start_load(source))
    }

    /// Resume the current track, reloading it if the engine no longer holds it.
    ///
    /// # Errors
    /// [`SessionError::NoCurrentTrack`] when nothing was ever played.
    pub fn play_current(&mut self) -> Result<Vec<Signal>, SessionError> {
        let Some(id) = self.current.clone() else {
            return Err(SessionError::NoCurrentTrack);
        };

        if self.state.is_active() {
            return Ok(Vec::new());
        }

        if self.state == PlaybackState::Paused && self.loaded == Some(self.generation) {
            let mut signals = self.commit(PlaybackState::Connecting);
            signals.push(Signal::Engine(EngineCommand::Play));
            return Ok(signals);
        }

        let source = self.catalog.resolve(&id)?.source.clone();
        Ok(self.start_load(source))
    }

    pub fn pause(&mut self) -> Vec<Signal> {
        if !self.state.is_active() {
            return Vec::new();
        }
        let mut signals = self.commit(PlaybackState::Paused);
        signals.push(Signal::Engine(EngineCommand::Pause));
        signals
    }

    /// Stop from any state. The current track is kept for a later resume;
    /// callbacks for the load in flight become stale.
    pub fn stop(&mut self) -> Vec<Signal> {
        self.generation += 1;
        self.loaded = None;
        let mut signals = self.commit(PlaybackState::Stopped);
        signals.push(Signal::Engine(EngineCommand::Stop));
        signals
    }

    /// Move the cursor forward without wrapping; loads the new track if it moved.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if a queued id vanished from the catalog.
    pub fn skip_next(&mut self) -> Result<Vec<Signal>, SessionError> {
        let target = match self.cursor {
            None if !self.queue.is_empty() => Some(0),
            Some(i) if i + 1 < self.queue.len() => Some(i + 1),
            _ => None,
        };
        self.skip_to(target)
    }

    /// Move the cursor back without wrapping; loads the new track if it moved.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if a queued id vanished from the catalog.
    pub fn skip_previous(&mut self) -> Result<Vec<Signal>, SessionError> {
        let target = match self.cursor {
            Some(i) if i > 0 => Some(i - 1),
            _ => None,
        };
        self.skip_to(target)
    }

    fn skip_to(&mut self, target: Option<usize>) -> Result<Vec<Signal>, SessionError> {
        let Some(pos) = target else {
            // Queue edge: nothing to load, but the user did something.
            return Ok(vec![Signal::Active(self.state.is_active())]);
        };
        let id = self.queue[pos].clone();
        let source = self.catalog.resolve(&id)?.source.clone();
        self.cursor = Some(pos);
        self.current = Some(id);
        Ok(self.start_load(source))
    }

    /// Apply an engine callback. Events for any generation but the current
    /// one are dropped.
    pub fn on_engine_event(&mut self, event: EngineEvent) -> Vec<Signal> {
        if event.generation != self.generation {
            tracing::debug!(
                event_generation = event.generation,
                current_generation = self.generation,
                kind = ?event.kind,
                "dropping stale engine event"
            );
            return Vec::new();
        }

        match event.kind {
            EngineEventKind::Buffering => match self.state {
                PlaybackState::Connecting => self.commit(PlaybackState::Buffering),
                _ => Vec::new(),
            },
            EngineEventKind::Playing => match self.state {
                PlaybackState::Connecting | PlaybackState::Buffering => {
                    self.commit(PlaybackState::Playing)
                }
                _ => Vec::new(),
            },
            EngineEventKind::Completed => {
                if self.state != PlaybackState::Playing {
                    return Vec::new();
                }
                self.loaded = None;
                let mut signals = self.commit(PlaybackState::Stopped);
                if let Some(id) = self.current.clone() {
                    signals.push(Signal::TrackFinished(id));
                }
                signals
            }
            EngineEventKind::Error(message) => {
                self.loaded = None;
                self.commit(PlaybackState::Error(message))
            }
        }
    }

    /// The host dropped the engine's resources; the next resume must reload.
    pub fn engine_released(&mut self) {
        self.loaded = None;
    }

    fn start_load(&mut self, source: std::path::PathBuf) -> Vec<Signal> {
        self.generation += 1;
        self.loaded = Some(self.generation);
        let mut signals = self.commit(PlaybackState::Connecting);
        signals.push(Signal::Engine(EngineCommand::Load {
            generation: self.generation,
            source,
        }));
        signals.push(Signal::Engine(EngineCommand::Play));
        signals
    }

    fn commit(&mut self, state: PlaybackState) -> Vec<Signal> {
        tracing::debug!(from = %self.state, to = %state, track = ?self.current, "session transition");
        self.state = state;
        vec![
            Signal::Snapshot(self.snapshot()),
            Signal::Active(self.state.is_active()),
        ]
    }
}

#[cfg(test)]
impl PlaybackSession {
    pub fn queue(&self) -> &[TrackId] {
        &self.queue
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn on_buffering(&mut self, generation: Generation) -> Vec<Signal> {
        self.on_engine_event(EngineEvent::new(generation, EngineEventKind::Buffering))
    }

    pub fn on_playing(&mut self, generation: Generation) -> Vec<Signal> {
        self.on_engine_event(EngineEvent::new(generation, EngineEventKind::Playing))
    }

    pub fn on_completion(&mut self, generation: Generation) -> Vec<Signal> {
        self.on_engine_event(EngineEvent::new(generation, EngineEventKind::Completed))
    }

    pub fn on_error(&mut self, generation: Generation, message: impl Into<String>) -> Vec<Signal> {
        self.on_engine_event(EngineEvent::new(
            generation,
            EngineEventKind::Error(message.into()),
        ))
    }
}
