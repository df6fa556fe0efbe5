//! Session host: the actor thread that owns the session and the idle timer.
//!
//! Commands, engine callbacks, timer expiries and subscriptions all arrive as
//! [`HostMsg`] values on one channel and are handled strictly one at a time.
//! The host turns the session's [`Signal`]s into observer notifications,
//! engine calls, idle timer arming and keepalive requests. It is the only
//! place that talks to the [`ProcessLifecycle`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::catalog::TrackId;
use crate::config::{AdvancePolicy, Settings};
use crate::engine::AudioEngine;

use super::idle::IdleTimer;
use super::machine::PlaybackSession;
use super::observer::SessionObserver;
use super::types::{
    EngineCommand, EngineEvent, EngineEventKind, Generation, SessionError, SessionSnapshot, Signal,
};

/// Keep-alive primitives of whatever hosts the daemon process.
pub trait ProcessLifecycle: Send {
    fn request_keepalive(&mut self);
    fn release_keepalive(&mut self);
}

#[derive(Debug, Clone)]
enum Command {
    PlayFromId(TrackId),
    PlayCurrent,
    PlayPause,
    Pause,
    Stop,
    SkipNext,
    SkipPrevious,
}

enum HostMsg {
    Command(Command, Sender<Result<(), SessionError>>),
    Engine(EngineEvent),
    IdleExpired(u64),
    Snapshot(Sender<SessionSnapshot>),
    Subscribe(Box<dyn SessionObserver>),
    Shutdown,
}

/// Tuning knobs of the host, usually taken from [`Settings`].
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub idle_timeout: Duration,
    pub advance: AdvancePolicy,
    pub fade_out: Duration,
}

impl From<&Settings> for HostOptions {
    fn from(s: &Settings) -> Self {
        Self {
            idle_timeout: Duration::from_millis(s.session.idle_timeout_ms),
            advance: s.session.advance,
            fade_out: Duration::from_millis(s.audio.quit_fade_out_ms),
        }
    }
}

/// Sender the audio engine uses to report back into the host.
#[derive(Clone)]
pub struct EngineEvents {
    tx: Sender<HostMsg>,
}

impl EngineEvents {
    pub fn emit(&self, generation: Generation, kind: EngineEventKind) {
        if self
            .tx
            .send(HostMsg::Engine(EngineEvent::new(generation, kind)))
            .is_err()
        {
            tracing::debug!(generation, "engine event after host shutdown");
        }
    }

    pub fn buffering(&self, generation: Generation) {
        self.emit(generation, EngineEventKind::Buffering);
    }

    pub fn playing(&self, generation: Generation) {
        self.emit(generation, EngineEventKind::Playing);
    }

    pub fn completed(&self, generation: Generation) {
        self.emit(generation, EngineEventKind::Completed);
    }

    pub fn error(&self, generation: Generation, message: impl Into<String>) {
        self.emit(generation, EngineEventKind::Error(message.into()));
    }
}

pub struct SessionHost {
    session: PlaybackSession,
    timer: IdleTimer,
    engine: Box<dyn AudioEngine>,
    lifecycle: Box<dyn ProcessLifecycle>,
    observers: Vec<Box<dyn SessionObserver>>,
    options: HostOptions,
    keepalive_held: bool,
    last_active: bool,
}

impl SessionHost {
    /// Start the host thread and return a handle to it.
    ///
    /// `make_engine` receives the sender the engine reports its events on.
    pub fn spawn<F>(
        session: PlaybackSession,
        options: HostOptions,
        make_engine: F,
        lifecycle: Box<dyn ProcessLifecycle>,
        observers: Vec<Box<dyn SessionObserver>>,
    ) -> SessionHandle
    where
        F: FnOnce(EngineEvents) -> Box<dyn AudioEngine>,
    {
        let (tx, rx) = mpsc::channel::<HostMsg>();
        let engine = make_engine(EngineEvents { tx: tx.clone() });

        let timer_tx = tx.clone();
        let timer = IdleTimer::spawn(move |token| {
            let _ = timer_tx.send(HostMsg::IdleExpired(token));
        });

        let host = SessionHost {
            session,
            timer,
            engine,
            lifecycle,
            observers,
            options,
            keepalive_held: false,
            last_active: false,
        };

        let join = thread::Builder::new()
            .name("cadenza-session".into())
            .spawn(move || host.run(rx));

        let join = match join {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn session host thread");
                None
            }
        };

        SessionHandle {
            tx,
            join: Arc::new(Mutex::new(join)),
        }
    }

    fn run(mut self, rx: Receiver<HostMsg>) {
        // Nobody may ever ask for anything; idle out in that case too.
        self.timer.arm(self.options.idle_timeout);

        while let Ok(msg) = rx.recv() {
            match msg {
                HostMsg::Command(cmd, reply) => {
                    let result = self.handle_command(cmd);
                    let _ = reply.send(result);
                }
                HostMsg::Engine(event) => {
                    let signals = self.session.on_engine_event(event);
                    self.apply(signals);
                }
                HostMsg::IdleExpired(token) => self.on_idle_expired(token),
                HostMsg::Snapshot(reply) => {
                    let _ = reply.send(self.session.snapshot());
                }
                HostMsg::Subscribe(mut observer) => {
                    observer.on_snapshot(&self.session.snapshot());
                    self.observers.push(observer);
                }
                HostMsg::Shutdown => break,
            }
        }

        self.teardown();
    }

    fn handle_command(&mut self, cmd: Command) -> Result<(), SessionError> {
        tracing::debug!(?cmd, "command");
        let signals = match cmd {
            Command::PlayFromId(id) => self.session.play_from_id(&id),
            Command::PlayCurrent => self.session.play_current(),
            Command::PlayPause if self.session.state().is_active() => Ok(self.session.pause()),
            Command::PlayPause => self.session.play_current(),
            Command::Pause => Ok(self.session.pause()),
            Command::Stop => Ok(self.session.stop()),
            Command::SkipNext => self.session.skip_next(),
            Command::SkipPrevious => self.session.skip_previous(),
        };

        match signals {
            Ok(signals) => {
                self.apply(signals);
                Ok(())
            }
            Err(e) => {
                tracing::info!(error = %e, "command rejected");
                Err(e)
            }
        }
    }

    fn apply(&mut self, signals: Vec<Signal>) {
        for signal in signals {
            match signal {
                Signal::Snapshot(snapshot) => {
                    for o in &mut self.observers {
                        o.on_snapshot(&snapshot);
                    }
                }
                Signal::Active(active) => self.on_activity(active),
                Signal::Engine(cmd) => self.dispatch(cmd),
                Signal::TrackFinished(id) => {
                    for o in &mut self.observers {
                        o.on_track_finished(&id);
                    }
                    self.advance_after(&id);
                }
            }
        }
    }

    fn on_activity(&mut self, active: bool) {
        if active {
            if !self.keepalive_held {
                tracing::debug!("requesting keepalive");
                self.lifecycle.request_keepalive();
                self.keepalive_held = true;
            }
            self.timer.disarm();
        } else {
            self.timer.arm(self.options.idle_timeout);
        }

        if active != self.last_active {
            self.last_active = active;
            for o in &mut self.observers {
                o.on_active_changed(active);
            }
        }
    }

    fn dispatch(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Load { generation, source } => {
                self.engine.load(generation, &source);
            }
            EngineCommand::Play => self.engine.play(),
            EngineCommand::Pause => self.engine.pause(),
            EngineCommand::Stop => self.engine.stop(),
        }
    }

    fn advance_after(&mut self, finished: &TrackId) {
        match self.options.advance {
            AdvancePolicy::Stop => {}
            AdvancePolicy::Next => {
                tracing::debug!(track = %finished, "advancing after finished track");
                match self.session.skip_next() {
                    Ok(signals) => self.apply(signals),
                    Err(e) => tracing::warn!(error = %e, "auto-advance failed"),
                }
            }
        }
    }

    fn on_idle_expired(&mut self, token: u64) {
        if !self.timer.expire(token) {
            tracing::debug!(token, "discarding stale idle expiry");
            return;
        }
        if self.engine.is_playing() {
            tracing::debug!("ignoring idle expiry, the engine is playing");
            if !self.session.state().is_active() {
                self.timer.arm(self.options.idle_timeout);
            }
            return;
        }

        tracing::info!("idle timeout reached, releasing keepalive");
        self.lifecycle.release_keepalive();
        self.keepalive_held = false;
        self.engine.stop();
        self.session.engine_released();
    }

    fn teardown(&mut self) {
        tracing::debug!("session host shutting down");
        self.timer.disarm();
        self.engine.shutdown(self.options.fade_out);
        if self.keepalive_held {
            self.lifecycle.release_keepalive();
            self.keepalive_held = false;
        }
        for o in &mut self.observers {
            o.on_shutdown();
        }
    }
}

/// Cloneable front door to the host thread.
///
/// Command methods return once the host has applied the transition; they
/// never wait for the engine.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<HostMsg>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    fn command(&self, cmd: Command) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(HostMsg::Command(cmd, reply_tx))
            .map_err(|_| SessionError::Closed)?;
        reply_rx.recv().map_err(|_| SessionError::Closed)?
    }

    /// # Errors
    /// [`SessionError::NotFound`] for unknown ids, [`SessionError::Closed`]
    /// after shutdown.
    pub fn play_from_id(&self, id: impl Into<TrackId>) -> Result<(), SessionError> {
        self.command(Command::PlayFromId(id.into()))
    }

    /// # Errors
    /// [`SessionError::NoCurrentTrack`] when nothing was played yet.
    pub fn play_current(&self) -> Result<(), SessionError> {
        self.command(Command::PlayCurrent)
    }

    /// Pause when active, otherwise resume the current track.
    ///
    /// # Errors
    /// Same as [`SessionHandle::play_current`].
    pub fn play_pause(&self) -> Result<(), SessionError> {
        self.command(Command::PlayPause)
    }

    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.command(Command::Pause)
    }

    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn stop(&self) -> Result<(), SessionError> {
        self.command(Command::Stop)
    }

    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn skip_next(&self) -> Result<(), SessionError> {
        self.command(Command::SkipNext)
    }

    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn skip_previous(&self) -> Result<(), SessionError> {
        self.command(Command::SkipPrevious)
    }

    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(HostMsg::Snapshot(reply_tx))
            .map_err(|_| SessionError::Closed)?;
        reply_rx.recv().map_err(|_| SessionError::Closed)
    }

    /// Register an observer; it immediately receives the current snapshot.
    ///
    /// # Errors
    /// [`SessionError::Closed`] after shutdown.
    pub fn subscribe(&self, observer: impl SessionObserver + 'static) -> Result<(), SessionError> {
        self.tx
            .send(HostMsg::Subscribe(Box::new(observer)))
            .map_err(|_| SessionError::Closed)
    }

    #[cfg(test)]
    pub fn engine_events(&self) -> EngineEvents {
        EngineEvents {
            tx: self.tx.clone(),
        }
    }

    /// Stop the host thread and wait for it. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(HostMsg::Shutdown);
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
