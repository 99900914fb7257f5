//! Spotify Web API response shapes and their mapping onto [`Track`].

use lumina_core::model::{format_duration_ms, UNKNOWN_DURATION};
use lumina_core::Track;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Option<Page<TrackItem>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewReleasesResponse {
    pub albums: Option<Page<AlbumItem>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Image {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    #[serde(default)]
    pub duration_ms: u64,
    pub preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub images: Vec<Image>,
}

fn join_artists(artists: &[ArtistRef]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn cover(images: &[Image], placeholder: &str) -> String {
    images
        .first()
        .map(|i| i.url.clone())
        .unwrap_or_else(|| placeholder.to_string())
}

impl TrackItem {
    pub fn into_track(self, placeholder: &str) -> Track {
        Track {
            artist: join_artists(&self.artists),
            cover_url: cover(&self.album.images, placeholder),
            duration: format_duration_ms(self.duration_ms),
            album: self.album.name,
            id: self.id,
            title: self.name,
            preview_url: self.preview_url.filter(|u| !u.is_empty()),
        }
    }
}

impl AlbumItem {
    pub fn into_track(self, placeholder: &str) -> Track {
        Track {
            artist: join_artists(&self.artists),
            cover_url: cover(&self.images, placeholder),
            duration: UNKNOWN_DURATION.to_string(),
            album: self.name.clone(),
            id: self.id,
            title: self.name,
            preview_url: None,
        }
    }
}

impl SearchResponse {
    pub fn into_tracks(self, placeholder: &str) -> Vec<Track> {
        self.tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.into_track(placeholder))
            .collect()
    }
}

impl NewReleasesResponse {
    pub fn into_tracks(self, placeholder: &str) -> Vec<Track> {
        self.albums
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.into_track(placeholder))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{NewReleasesResponse, SearchResponse};

    const PLACEHOLDER: &str = "https://picsum.photos/200/200";

    #[test]
    fn maps_search_items() {
        let raw = r#"{"tracks":{"items":[
            {"id":"t1","name":"Starboy","duration_ms":230000,
             "preview_url":"https://p.scdn.co/mp3-preview/t1",
             "artists":[{"name":"The Weeknd"},{"name":"Daft Punk"}],
             "album":{"name":"Starboy","images":[{"url":"https://i.scdn.co/a"},{"url":"https://i.scdn.co/b"}]}},
            {"id":"t2","name":"Intro","duration_ms":45000,"preview_url":null,
             "artists":[{"name":"M83"}],"album":{"name":"Hurry Up","images":[]}}
        ]}}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).expect("parse");
        let tracks = parsed.into_tracks(PLACEHOLDER);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artist, "The Weeknd, Daft Punk");
        assert_eq!(tracks[0].duration, "3:50");
        assert_eq!(tracks[0].cover_url, "https://i.scdn.co/a");
        assert!(tracks[0].is_playable());

        assert_eq!(tracks[1].duration, "0:45");
        assert_eq!(tracks[1].cover_url, PLACEHOLDER);
        assert_eq!(tracks[1].preview_url, None);
    }

    #[test]
    fn missing_sections_are_empty() {
        let parsed: SearchResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.into_tracks(PLACEHOLDER).is_empty());

        let parsed: NewReleasesResponse =
            serde_json::from_str(r#"{"albums":{}}"#).expect("parse");
        assert!(parsed.into_tracks(PLACEHOLDER).is_empty());
    }

    #[test]
    fn maps_release_albums_without_preview() {
        let raw = r#"{"albums":{"items":[
            {"id":"a1","name":"After Hours","artists":[{"name":"The Weeknd"}],
             "images":[{"url":"https://i.scdn.co/ah"}]}
        ]}}"#;
        let parsed: NewReleasesResponse = serde_json::from_str(raw).expect("parse");
        let tracks = parsed.into_tracks(PLACEHOLDER);

        assert_eq!(tracks[0].title, "After Hours");
        assert_eq!(tracks[0].album, "After Hours");
        assert_eq!(tracks[0].duration, "--:--");
        assert!(!tracks[0].is_playable());
    }
}
