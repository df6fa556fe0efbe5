use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread;

use crate::mpris::ControlCmd;

const HELP: &str = "commands: play [id], pause, toggle, stop, next, prev, list, status, quit";

/// Parse one console line. `None` for blank or unknown input.
pub(super) fn parse_command(line: &str) -> Option<ControlCmd> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "play" if !rest.is_empty() => ControlCmd::PlayFromId(rest.to_string()),
        "play" => ControlCmd::Play,
        "pause" => ControlCmd::Pause,
        "toggle" | "playpause" => ControlCmd::PlayPause,
        "stop" => ControlCmd::Stop,
        "next" | "n" => ControlCmd::Next,
        "prev" | "previous" | "p" => ControlCmd::Prev,
        "list" | "ls" => ControlCmd::List,
        "status" | "st" => ControlCmd::Status,
        "quit" | "q" | "exit" => ControlCmd::Quit,
        _ => return None,
    };
    Some(cmd)
}

/// Read commands from stdin, one per line, until EOF.
pub fn spawn(tx: Sender<ControlCmd>) {
    let spawned = thread::Builder::new()
        .name("cadenza-console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    None => println!("{HELP}"),
                }
            }
            tracing::debug!("console: stdin closed");
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "console: failed to spawn reader");
    }
}
