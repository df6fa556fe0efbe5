use std::path::Path;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::session::{EngineEvents, Generation};

use super::AudioEngine;
use super::output::{OutputCmd, OutputStatus, StatusHandle, spawn_output_thread};

/// [`AudioEngine`] backed by a `rodio` output thread.
pub struct RodioEngine {
    tx: Sender<OutputCmd>,
    status: StatusHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl RodioEngine {
    pub fn new(events: EngineEvents) -> Self {
        let (tx, rx) = mpsc::channel::<OutputCmd>();
        let status: StatusHandle = Arc::new(Mutex::new(OutputStatus::default()));

        let join = match spawn_output_thread(rx, events, status.clone()) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn audio output thread");
                None
            }
        };

        Self {
            tx,
            status,
            join: Mutex::new(join),
        }
    }

    fn send(&self, cmd: OutputCmd) {
        if let Err(e) = self.tx.send(cmd) {
            tracing::warn!(cmd = ?e.0, "audio output thread is gone");
        }
    }
}

impl AudioEngine for RodioEngine {
    fn load(&mut self, generation: Generation, source: &Path) {
        self.send(OutputCmd::Load {
            generation,
            source: source.to_path_buf(),
        });
    }

    fn play(&mut self) {
        self.send(OutputCmd::Play);
    }

    fn pause(&mut self) {
        self.send(OutputCmd::Pause);
    }

    fn stop(&mut self) {
        self.send(OutputCmd::Stop);
    }

    fn is_playing(&self) -> bool {
        self.status.lock().map(|s| s.playing).unwrap_or(false)
    }

    fn shutdown(&mut self, fade_out: Duration) {
        self.send(OutputCmd::Shutdown {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
