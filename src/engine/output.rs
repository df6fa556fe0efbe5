use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::session::{EngineEvents, Generation};

use super::sink::{EngineError, create_sink, fade_out_sink};

#[derive(Debug)]
pub(super) enum OutputCmd {
    Load {
        generation: Generation,
        source: PathBuf,
    },
    Play,
    Pause,
    Stop,
    Shutdown {
        fade_out_ms: u64,
    },
}

/// What the rest of the process may read about the output thread.
#[derive(Debug, Clone, Default)]
pub(super) struct OutputStatus {
    pub playing: bool,
}

pub(super) type StatusHandle = std::sync::Arc<std::sync::Mutex<OutputStatus>>;

fn open_stream() -> Option<OutputStream> {
    match OutputStreamBuilder::open_default_stream() {
        Ok(mut stream) => {
            // rodio logs to stderr when the stream is dropped; keep the daemon quiet.
            stream.log_on_drop(false);
            Some(stream)
        }
        Err(e) => {
            tracing::error!(error = %e, "no audio output device, every load will fail");
            None
        }
    }
}

fn set_playing(status: &StatusHandle, playing: bool) {
    if let Ok(mut s) = status.lock() {
        s.playing = playing;
    }
}

pub(super) fn spawn_output_thread(
    rx: Receiver<OutputCmd>,
    events: EngineEvents,
    status: StatusHandle,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("cadenza-output".into())
        .spawn(move || {
            let stream = open_stream();
            let mut current: Option<(Generation, Sink)> = None;

            loop {
                match rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(OutputCmd::Load { generation, source }) => {
                        if let Some((_, old)) = current.take() {
                            old.stop();
                        }
                        set_playing(&status, false);
                        events.buffering(generation);

                        let sink = match stream.as_ref() {
                            Some(stream) => create_sink(stream, &source),
                            None => Err(EngineError::NoOutput),
                        };
                        match sink {
                            Ok(sink) => {
                                tracing::debug!(generation, source = %source.display(), "loaded");
                                current = Some((generation, sink));
                            }
                            Err(e) => {
                                tracing::warn!(generation, error = %e, "load failed");
                                set_playing(&status, false);
                                events.error(generation, e.to_string());
                            }
                        }
                    }
                    Ok(OutputCmd::Play) => {
                        if let Some((generation, sink)) = current.as_ref() {
                            sink.play();
                            set_playing(&status, true);
                            events.playing(*generation);
                        }
                    }
                    Ok(OutputCmd::Pause) => {
                        if let Some((_, sink)) = current.as_ref() {
                            sink.pause();
                            set_playing(&status, false);
                        }
                    }
                    Ok(OutputCmd::Stop) => {
                        if let Some((_, sink)) = current.take() {
                            sink.stop();
                        }
                        set_playing(&status, false);
                    }
                    Ok(OutputCmd::Shutdown { fade_out_ms }) => {
                        if let Some((_, sink)) = current.take() {
                            if !sink.is_paused() {
                                fade_out_sink(&sink, fade_out_ms);
                            }
                            sink.stop();
                        }
                        set_playing(&status, false);
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        // Periodic check for the end of the track.
                        let finished = match current.as_ref() {
                            Some((generation, sink)) if !sink.is_paused() && sink.empty() => {
                                Some(*generation)
                            }
                            _ => None,
                        };
                        if let Some(generation) = finished {
                            current = None;
                            set_playing(&status, false);
                            events.completed(generation);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
}
