//! [`PlaybackPort`] backed by an `mpv` child process driven over its JSON IPC
//! socket.
//!
//! ```text
//!   MpvPort (sync, owned by the controller)
//!     └── commands: unbounded mpsc ──► driver task ──► socket writer
//!                                           └── reader task ──► PlaybackEvent channel
//! ```
//!
//! The process is spawned on the first `load` and killed on `release`.

use lumina_engine::{PlaybackEvent, PlaybackPort, PortError};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const OBS_TIME_POS: u64 = 1;
const OBS_DURATION: u64 = 2;

pub struct MpvPort {
    binary: String,
    socket_path: PathBuf,
    initial_volume: u8,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    commands: Option<mpsc::UnboundedSender<Value>>,
}

impl MpvPort {
    pub fn new(
        binary: impl Into<String>,
        initial_volume: u8,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("lumina-mpv-{}.sock", std::process::id()));
        Self {
            binary: binary.into(),
            socket_path,
            initial_volume,
            events,
            commands: None,
        }
    }

    fn send(&self, command: Value) -> Result<(), PortError> {
        let tx = self.commands.as_ref().ok_or(PortError::NotLoaded)?;
        tx.send(command)
            .map_err(|_| PortError::Unavailable("mpv driver stopped".to_string()))
    }

    #[cfg(unix)]
    fn ensure_driver(&mut self) -> Result<(), PortError> {
        if self.commands.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver {
            binary: self.binary.clone(),
            socket_path: self.socket_path.clone(),
            initial_volume: self.initial_volume,
        };
        let events = self.events.clone();
        runtime.spawn(async move {
            if let Err(err) = driver.run(rx, events).await {
                warn!(error = %err, "mpv driver stopped");
            }
        });
        self.commands = Some(tx);
        Ok(())
    }

    #[cfg(not(unix))]
    fn ensure_driver(&mut self) -> Result<(), PortError> {
        Err(PortError::Unsupported)
    }
}

impl PlaybackPort for MpvPort {
    fn load(&mut self, url: &str) -> Result<(), PortError> {
        if url.trim().is_empty() {
            return Err(PortError::Rejected("empty media url".to_string()));
        }
        self.ensure_driver()?;
        // loadfile keeps the current pause state; play() unpauses
        self.send(json!(["set_property", "pause", true]))?;
        self.send(json!(["loadfile", url, "replace"]))
    }

    fn play(&mut self) -> Result<(), PortError> {
        self.send(json!(["set_property", "pause", false]))
    }

    fn pause(&mut self) -> Result<(), PortError> {
        self.send(json!(["set_property", "pause", true]))
    }

    fn seek(&mut self, position_secs: f64) -> Result<(), PortError> {
        self.send(json!(["seek", position_secs, "absolute"]))
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PortError> {
        self.initial_volume = volume;
        self.send(json!(["set_property", "volume", volume]))
    }

    fn release(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(json!(["quit"]));
        }
    }
}

impl Drop for MpvPort {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
struct Driver {
    binary: String,
    socket_path: PathBuf,
    initial_volume: u8,
}

#[cfg(unix)]
impl Driver {
    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Value>,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> anyhow::Result<()> {
        use tokio::io::{AsyncWriteExt, BufReader};
        use tokio::net::UnixStream;

        let _ = std::fs::remove_file(&self.socket_path);

        info!(binary = %self.binary, "spawning mpv");
        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(format!("--input-ipc-server={}", self.socket_path.display()))
            .arg("--quiet")
            .arg(format!("--volume={}", self.initial_volume.min(100)))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        for _ in 0..50 {
            if self.socket_path.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        if !self.socket_path.exists() {
            let _ = child.kill().await;
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&self.socket_path).await?;
        let (read_half, mut write_half) = stream.into_split();
        let (loads_tx, mut loads) = mpsc::unbounded_channel();
        tokio::spawn(read_events(BufReader::new(read_half), events, loads_tx));

        let observe = [
            json!(["observe_property", OBS_TIME_POS, "time-pos"]),
            json!(["observe_property", OBS_DURATION, "duration"]),
        ];
        for command in observe {
            write_half.write_all(encode(command)?.as_bytes()).await?;
        }

        let mut gate = CommandGate::default();
        loop {
            let outgoing = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => gate.outgoing(command),
                    None => break,
                },
                signal = loads.recv() => match signal {
                    Some(LoadSignal::Loaded) => gate.file_loaded(),
                    Some(LoadSignal::Failed) => {
                        gate.load_failed();
                        None
                    }
                    None => break,
                },
            };
            let Some(command) = outgoing else {
                continue;
            };
            let quit = command.get(0).and_then(Value::as_str) == Some("quit");
            debug!(command = %command, "mpv command");
            if let Err(err) = write_half.write_all(encode(command)?.as_bytes()).await {
                warn!(error = %err, "mpv socket write failed");
                break;
            }
            if quit {
                break;
            }
        }

        info!("stopping mpv");
        let _ = child.kill().await;
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadSignal {
    Loaded,
    Failed,
}

/// mpv refuses `seek` until a file has finished opening, so a seek sent right
/// after `loadfile` is held until `file-loaded` arrives. Only the latest one
/// is kept.
#[derive(Debug, Default)]
struct CommandGate {
    loading: bool,
    deferred_seek: Option<Value>,
}

impl CommandGate {
    fn outgoing(&mut self, command: Value) -> Option<Value> {
        match command.get(0).and_then(Value::as_str) {
            Some("loadfile") => {
                self.loading = true;
                self.deferred_seek = None;
                Some(command)
            }
            Some("seek") if self.loading => {
                self.deferred_seek = Some(command);
                None
            }
            _ => Some(command),
        }
    }

    fn file_loaded(&mut self) -> Option<Value> {
        self.loading = false;
        self.deferred_seek.take()
    }

    fn load_failed(&mut self) {
        self.loading = false;
        self.deferred_seek = None;
    }
}

fn load_signal(msg: &Value) -> Option<LoadSignal> {
    match msg.get("event").and_then(Value::as_str)? {
        "file-loaded" => Some(LoadSignal::Loaded),
        "end-file" if msg.get("reason").and_then(Value::as_str) == Some("error") => {
            Some(LoadSignal::Failed)
        }
        _ => None,
    }
}

fn encode(command: Value) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&json!({ "command": command }))?;
    line.push('\n');
    Ok(line)
}

#[cfg(unix)]
async fn read_events<R>(
    mut reader: tokio::io::BufReader<R>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    loads: mpsc::UnboundedSender<LoadSignal>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut tracker = ProgressTracker::default();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv socket closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let msg: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(err) => {
                        debug!(error = %err, line = trimmed, "invalid mpv json");
                        continue;
                    }
                };
                if let Some(signal) = load_signal(&msg) {
                    let _ = loads.send(signal);
                }
                if let Some(event) = tracker.apply(&msg) {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "mpv socket read failed");
                break;
            }
        }
    }
}

/// Folds mpv's IPC messages into [`PlaybackEvent`]s.
#[derive(Debug, Default)]
struct ProgressTracker {
    position: f64,
    duration: f64,
}

impl ProgressTracker {
    fn apply(&mut self, msg: &Value) -> Option<PlaybackEvent> {
        if let Some(error) = msg.get("error").and_then(Value::as_str) {
            if error != "success" {
                warn!(error, "mpv rejected a command");
            }
            return None;
        }

        match msg.get("event").and_then(Value::as_str)? {
            "property-change" => {
                let value = msg.get("data").and_then(Value::as_f64);
                match msg.get("id").and_then(Value::as_u64)? {
                    OBS_TIME_POS => self.position = value.unwrap_or(0.0),
                    OBS_DURATION => self.duration = value.unwrap_or(0.0),
                    _ => return None,
                }
                Some(PlaybackEvent::Progress {
                    position: self.position,
                    duration: self.duration,
                })
            }
            "end-file" => {
                let reason = msg.get("reason").and_then(Value::as_str).unwrap_or_default();
                (reason == "eof").then_some(PlaybackEvent::Ended)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        encode, load_signal, CommandGate, LoadSignal, MpvPort, ProgressTracker, OBS_DURATION,
        OBS_TIME_POS,
    };
    use lumina_engine::{PlaybackEvent, PlaybackPort, PortError};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn property_changes_become_progress() {
        let mut t = ProgressTracker::default();
        assert_eq!(
            t.apply(&json!({"event": "property-change", "id": OBS_DURATION, "name": "duration", "data": 29.8})),
            Some(PlaybackEvent::Progress {
                position: 0.0,
                duration: 29.8
            })
        );
        assert_eq!(
            t.apply(&json!({"event": "property-change", "id": OBS_TIME_POS, "name": "time-pos", "data": 3.5})),
            Some(PlaybackEvent::Progress {
                position: 3.5,
                duration: 29.8
            })
        );
        // unset after a file ends
        assert_eq!(
            t.apply(&json!({"event": "property-change", "id": OBS_TIME_POS, "name": "time-pos"})),
            Some(PlaybackEvent::Progress {
                position: 0.0,
                duration: 29.8
            })
        );
    }

    #[test]
    fn only_natural_end_of_file_is_ended() {
        let mut t = ProgressTracker::default();
        assert_eq!(
            t.apply(&json!({"event": "end-file", "reason": "eof"})),
            Some(PlaybackEvent::Ended)
        );
        assert_eq!(t.apply(&json!({"event": "end-file", "reason": "stop"})), None);
        assert_eq!(t.apply(&json!({"event": "end-file", "reason": "error", "file_error": "loading failed"})), None);
    }

    #[test]
    fn replies_and_other_events_are_ignored() {
        let mut t = ProgressTracker::default();
        assert_eq!(t.apply(&json!({"error": "success", "data": null})), None);
        assert_eq!(t.apply(&json!({"error": "property unavailable"})), None);
        assert_eq!(t.apply(&json!({"event": "file-loaded"})), None);
    }

    #[test]
    fn commands_are_newline_terminated_json() {
        let line = encode(json!(["seek", 7.5, "absolute"])).expect("encode");
        assert_eq!(line, "{\"command\":[\"seek\",7.5,\"absolute\"]}\n");
    }

    #[test]
    fn seek_while_opening_waits_for_file_loaded() {
        let mut gate = CommandGate::default();
        let load = json!(["loadfile", "https://p.scdn.co/mp3-preview/a", "replace"]);
        assert_eq!(gate.outgoing(load.clone()), Some(load));
        assert_eq!(gate.outgoing(json!(["seek", 4.0, "absolute"])), None);
        assert_eq!(gate.outgoing(json!(["seek", 9.0, "absolute"])), None);
        let play = json!(["set_property", "pause", false]);
        assert_eq!(gate.outgoing(play.clone()), Some(play));

        assert_eq!(gate.file_loaded(), Some(json!(["seek", 9.0, "absolute"])));
        assert_eq!(gate.file_loaded(), None);
        let seek = json!(["seek", 2.0, "absolute"]);
        assert_eq!(gate.outgoing(seek.clone()), Some(seek));
    }

    #[test]
    fn failed_open_drops_the_held_seek() {
        let mut gate = CommandGate::default();
        gate.outgoing(json!(["loadfile", "https://p.scdn.co/mp3-preview/a", "replace"]));
        assert_eq!(gate.outgoing(json!(["seek", 4.0, "absolute"])), None);
        gate.load_failed();
        assert_eq!(gate.file_loaded(), None);
    }

    #[test]
    fn load_signals_come_from_file_events() {
        assert_eq!(load_signal(&json!({"event": "file-loaded"})), Some(LoadSignal::Loaded));
        assert_eq!(
            load_signal(&json!({"event": "end-file", "reason": "error"})),
            Some(LoadSignal::Failed)
        );
        assert_eq!(load_signal(&json!({"event": "end-file", "reason": "stop"})), None);
        assert_eq!(load_signal(&json!({"error": "success"})), None);
    }

    #[test]
    fn blank_url_is_rejected_without_spawning() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut port = MpvPort::new("mpv", 50, tx);
        assert!(matches!(port.load("  "), Err(PortError::Rejected(_))));
        assert!(port.commands.is_none());
    }
}
