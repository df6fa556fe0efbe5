use std::sync::mpsc::Sender;

use crate::mpris::ControlCmd;
use crate::session::ProcessLifecycle;

/// Process residency: the daemon stays up while playback holds the
/// keepalive and, when configured, exits once it is released.
pub struct Residency {
    /// Where to ask for a quit on release; `None` keeps the daemon resident.
    quit: Option<Sender<ControlCmd>>,
}

impl Residency {
    pub fn new(quit: Option<Sender<ControlCmd>>) -> Self {
        Self { quit }
    }
}

impl ProcessLifecycle for Residency {
    fn request_keepalive(&mut self) {
        tracing::info!("playback active, staying resident");
    }

    fn release_keepalive(&mut self) {
        match &self.quit {
            // Called on the host thread: only queue the quit, the runtime
            // performs the shutdown.
            Some(tx) => {
                tracing::info!("idle, exiting");
                let _ = tx.send(ControlCmd::Quit);
            }
            None => tracing::info!("idle, keepalive released"),
        }
    }
}
