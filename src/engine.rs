//! Audio engine boundary.
//!
//! The session never talks to an output device directly: the host forwards
//! [`crate::session::EngineCommand`]s to an [`AudioEngine`], and the engine
//! reports back asynchronously through [`crate::session::EngineEvents`],
//! tagging every event with the load generation it belongs to.

mod output;
mod player;
mod sink;

use std::path::Path;
use std::time::Duration;

use crate::session::Generation;

pub use player::RodioEngine;

/// Fire-and-forget control surface of an audio renderer.
pub trait AudioEngine: Send {
    /// Replace whatever is loaded with `source`, tagged `generation`.
    fn load(&mut self, generation: Generation, source: &Path);
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop and drop the loaded source.
    fn stop(&mut self);
    /// Whether audio is audibly playing right now.
    fn is_playing(&self) -> bool;
    /// Final stop, fading out over `fade_out`.
    fn shutdown(&mut self, _fade_out: Duration) {
        self.stop();
    }
}
