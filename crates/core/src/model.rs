use serde::{Deserialize, Serialize};

/// Display duration for catalog entries that carry no length (album releases).
pub const UNKNOWN_DURATION: &str = "--:--";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub cover_url: String,
    pub preview_url: Option<String>,
}

impl Track {
    /// True when a 30-second preview clip can be played for this track.
    pub fn is_playable(&self) -> bool {
        self.preview_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub title: String,
    pub artist: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrichedRecommendation {
    pub recommendation: Recommendation,
    /// First catalog match for "{title} {artist}"; `None` renders as unplayable.
    pub track: Option<Track>,
}

pub fn format_duration_ms(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{minutes}:{seconds:02}")
}

/// Player clock, `M:SS`. Unknown or negative times show as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn sample_tracks() -> Vec<Track> {
    const SAMPLES: [(&str, &str, &str, &str, &str, &str); 6] = [
        ("1", "Starboy", "The Weeknd", "Starboy", "3:50", "starboy"),
        ("2", "Midnight City", "M83", "Hurry Up, We're Dreaming", "4:03", "m83"),
        ("3", "Levitating", "Dua Lipa", "Future Nostalgia", "3:23", "dua"),
        ("4", "Blinding Lights", "The Weeknd", "After Hours", "3:20", "blinding"),
        ("5", "Heat Waves", "Glass Animals", "Dreamland", "3:58", "glass"),
        ("6", "Circles", "Post Malone", "Hollywood's Bleeding", "3:35", "post"),
    ];

    SAMPLES
        .iter()
        .map(|(id, title, artist, album, duration, seed)| Track {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            duration: duration.to_string(),
            cover_url: format!("https://picsum.photos/seed/{seed}/200/200"),
            preview_url: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{format_clock, format_duration_ms, sample_tracks, Track};

    #[test]
    fn duration_pads_seconds() {
        assert_eq!(format_duration_ms(230_000), "3:50");
        assert_eq!(format_duration_ms(45_000), "0:45");
        assert_eq!(format_duration_ms(61_999), "1:01");
        assert_eq!(format_duration_ms(0), "0:00");
    }

    #[test]
    fn clock_handles_unknown_duration() {
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(-3.0), "0:00");
        assert_eq!(format_clock(29.7), "0:29");
        assert_eq!(format_clock(125.0), "2:05");
    }

    #[test]
    fn playable_requires_non_empty_preview() {
        let mut track = sample_tracks().remove(0);
        assert!(!track.is_playable());

        track.preview_url = Some("   ".to_string());
        assert!(!track.is_playable());

        track.preview_url = Some("https://p.scdn.co/mp3-preview/abc".to_string());
        assert!(track.is_playable());
    }

    #[test]
    fn samples_are_unique_and_unplayable() {
        let tracks: Vec<Track> = sample_tracks();
        assert_eq!(tracks.len(), 6);
        assert_eq!(tracks[1].title, "Midnight City");
        let mut ids: Vec<&str> = tracks.iter().map(|t| t.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 6);
        assert!(tracks.iter().all(|t| !t.is_playable()));
    }
}
