use lumina_core::Track;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("no media resource is loaded")]
    NotLoaded,
    #[error("media backend rejected the request: {0}")]
    Rejected(String),
    #[error("media backend unavailable: {0}")]
    Unavailable(String),
    #[error("media playback is not supported on this platform")]
    Unsupported,
}

/// What the media backend reports back while a resource is bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Progress { position: f64, duration: f64 },
    Ended,
}

/// A single reusable media resource. `load` rebinds its source; the resource is
/// only torn down by `release`.
pub trait PlaybackPort: Send {
    fn load(&mut self, url: &str) -> Result<(), PortError>;
    fn play(&mut self) -> Result<(), PortError>;
    fn pause(&mut self) -> Result<(), PortError>;
    fn seek(&mut self, position_secs: f64) -> Result<(), PortError>;
    /// Volume is 0..=100.
    fn set_volume(&mut self, volume: u8) -> Result<(), PortError>;
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Empty,
    Paused,
    Playing,
    Ended,
}

pub struct PlaybackController<P: PlaybackPort> {
    port: P,
    current: Option<Track>,
    bound_url: Option<String>,
    is_playing: bool,
    ended: bool,
    volume: u8,
    current_time: f64,
    duration: f64,
}

impl<P: PlaybackPort> PlaybackController<P> {
    pub fn new(port: P) -> Self {
        Self::with_volume(port, DEFAULT_VOLUME)
    }

    pub fn with_volume(port: P, volume: u8) -> Self {
        Self {
            port,
            current: None,
            bound_url: None,
            is_playing: false,
            ended: false,
            volume: volume.min(100),
            current_time: 0.0,
            duration: 0.0,
        }
    }

    /// Makes `track` current. A playable track is bound to the resource and
    /// keeps playing if playback was already running. A track without a preview
    /// pauses whatever was bound and leaves the transport inert.
    pub fn select(&mut self, track: Track) {
        self.ended = false;
        self.current_time = 0.0;
        self.duration = 0.0;

        let url = track
            .preview_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        debug!(id = %track.id, title = %track.title, playable = url.is_some(), "track selected");
        self.current = Some(track);

        let Some(url) = url else {
            if self.bound_url.is_some() && self.is_playing {
                if let Err(err) = self.port.pause() {
                    warn!(error = %err, "pause failed");
                }
            }
            self.is_playing = false;
            return;
        };

        if !self.bind(&url) {
            self.is_playing = false;
            return;
        }
        if self.is_playing {
            self.start();
        }
    }

    pub fn toggle(&mut self) {
        if !self.transport_enabled() {
            debug!("transport inert; toggle ignored");
            return;
        }

        self.is_playing = !self.is_playing;
        if !self.is_playing {
            if let Err(err) = self.port.pause() {
                warn!(error = %err, "pause failed");
            }
            return;
        }

        if self.ended {
            // an ended resource restarts from the top of its source
            if let Some(url) = self.bound_url.clone() {
                self.bind(&url);
            }
        }
        self.start();
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) {
        if self.bound_url.is_none() {
            return;
        }
        match event {
            PlaybackEvent::Progress { position, duration } => {
                if position.is_finite() && position >= 0.0 {
                    self.current_time = position;
                }
                if duration.is_finite() && duration > 0.0 {
                    self.duration = duration;
                }
            }
            PlaybackEvent::Ended => {
                debug!("playback ended");
                self.ended = true;
                self.is_playing = false;
            }
        }
    }

    /// Seeks to the fraction `x / width` of the bound resource. Ignored until
    /// the duration is known.
    pub fn seek_to_offset(&mut self, x: f64, width: f64) {
        if self.bound_url.is_none() || self.duration <= 0.0 || !width.is_finite() || width <= 0.0 {
            return;
        }
        let target = (x / width).clamp(0.0, 1.0) * self.duration;
        if self.ended {
            // the backend unloads a finished source; it must be bound again to seek
            let Some(url) = self.bound_url.clone() else {
                return;
            };
            if !self.bind(&url) {
                return;
            }
        }
        match self.port.seek(target) {
            Ok(()) => {
                self.current_time = target;
                self.ended = false;
            }
            Err(err) => warn!(error = %err, target, "seek failed"),
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        if self.bound_url.is_some() {
            if let Err(err) = self.port.set_volume(self.volume) {
                warn!(error = %err, "volume change failed");
            }
        }
    }

    pub fn adjust_volume(&mut self, delta: i16) {
        let next = (i16::from(self.volume) + delta).clamp(0, 100);
        self.set_volume(next as u8);
    }

    pub fn shutdown(&mut self) {
        if self.bound_url.take().is_some() {
            debug!("releasing media resource");
        }
        self.port.release();
        self.is_playing = false;
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn transport_enabled(&self) -> bool {
        self.bound_url.is_some() && self.current.as_ref().is_some_and(Track::is_playable)
    }

    pub fn status(&self) -> PlayerStatus {
        if !self.transport_enabled() {
            PlayerStatus::Empty
        } else if self.ended {
            PlayerStatus::Ended
        } else if self.is_playing {
            PlayerStatus::Playing
        } else {
            PlayerStatus::Paused
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    fn bind(&mut self, url: &str) -> bool {
        let created = self.bound_url.is_none();
        if let Err(err) = self.port.load(url) {
            warn!(error = %err, url, "media source rejected");
            self.bound_url = None;
            return false;
        }
        debug!(url, created, "media source bound");
        self.bound_url = Some(url.to_string());
        self.ended = false;
        self.current_time = 0.0;
        if let Err(err) = self.port.set_volume(self.volume) {
            warn!(error = %err, "volume change failed");
        }
        true
    }

    fn start(&mut self) {
        // a refused play keeps the toggled state; the backend reports the truth later
        if let Err(err) = self.port.play() {
            warn!(error = %err, "play failed");
        }
    }
}
