//! The playback session: state machine, idle timer and the host actor that
//! serializes every command and engine callback through them.

mod host;
mod idle;
mod machine;
mod observer;
mod types;

pub use host::{EngineEvents, HostOptions, ProcessLifecycle, SessionHandle, SessionHost};
pub use machine::PlaybackSession;
pub use observer::{LogObserver, ObserverEvent, SessionObserver};
pub use types::*;

#[cfg(test)]
mod tests;
