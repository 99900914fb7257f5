use lumina_core::model::sample_tracks;
use lumina_core::{EnrichedRecommendation, Track};
use lumina_engine::SessionState;

/// Browse tiles shown on the search view before anything is typed.
pub const GENRES: [&str; 10] = [
    "Podcasts",
    "Live Events",
    "Pop",
    "Hip-Hop",
    "Rock",
    "Latin",
    "Mood",
    "Dance",
    "Indie",
    "Relax",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Search,
    Dj,
}

impl View {
    pub const ALL: [View; 3] = [View::Home, View::Search, View::Dj];

    pub fn next(self) -> Self {
        match self {
            View::Home => View::Search,
            View::Search => View::Dj,
            View::Dj => View::Home,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Home => "Home",
            View::Search => "Search",
            View::Dj => "AI DJ",
        }
    }
}

/// One row in a track list. DJ rows without a catalog match have no track and
/// render muted.
#[derive(Debug, Clone)]
pub struct Row {
    pub primary: String,
    pub secondary: String,
    pub detail: String,
    pub track: Option<Track>,
}

impl Row {
    fn from_track(t: &Track) -> Self {
        Self {
            primary: t.title.clone(),
            secondary: format!("{} · {}", t.artist, t.album),
            detail: t.duration.clone(),
            track: Some(t.clone()),
        }
    }

    fn from_recommendation(item: &EnrichedRecommendation) -> Self {
        let rec = &item.recommendation;
        Self {
            primary: format!("{} - {}", rec.artist, rec.title),
            secondary: rec.reason.clone(),
            detail: match &item.track {
                Some(t) => t.duration.clone(),
                None => "not found".to_string(),
            },
            track: item.track.clone(),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.track.is_none()
    }
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPane {
    Genres,
    Message(String),
    Results,
}

/// What the search view body shows. An empty query always browses genres.
pub fn search_pane(state: SessionState, query: &str) -> SearchPane {
    let query = query.trim();
    if query.is_empty() {
        return SearchPane::Genres;
    }
    let text = match state {
        SessionState::Results => return SearchPane::Results,
        SessionState::Disconnected => "Connect a session to search (t)".to_string(),
        SessionState::Searching => "Searching...".to_string(),
        SessionState::NoResults => format!("No results found for \"{query}\""),
        SessionState::Idle => "Type at least 3 characters".to_string(),
    };
    SearchPane::Message(text)
}

/// Home shows the live releases, or the bundled samples while there are none.
pub fn home_rows(releases: &[Track]) -> Vec<Row> {
    if releases.is_empty() {
        sample_tracks().iter().map(Row::from_track).collect()
    } else {
        releases.iter().map(Row::from_track).collect()
    }
}

pub fn search_rows(results: &[Track]) -> Vec<Row> {
    results.iter().map(Row::from_track).collect()
}

pub fn dj_rows(items: &[EnrichedRecommendation]) -> Vec<Row> {
    items.iter().map(Row::from_recommendation).collect()
}

#[cfg(test)]
mod tests {
    use super::{dj_rows, greeting, home_rows, search_pane, SearchPane, View, GENRES};
    use lumina_core::{EnrichedRecommendation, Recommendation, Track};
    use lumina_engine::SessionState;

    #[test]
    fn tab_cycles_through_every_view() {
        let mut v = View::Home;
        let mut seen = Vec::new();
        for _ in 0..View::ALL.len() {
            seen.push(v);
            v = v.next();
        }
        assert_eq!(seen, View::ALL.to_vec());
        assert_eq!(v, View::Home);
    }

    #[test]
    fn home_falls_back_to_samples() {
        let rows = home_rows(&[]);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.track.as_ref().is_some_and(|t| !t.is_playable())));

        let live = Track {
            id: "a1".to_string(),
            title: "After Hours".to_string(),
            artist: "The Weeknd".to_string(),
            album: "After Hours".to_string(),
            duration: "--:--".to_string(),
            cover_url: "https://picsum.photos/200/200".to_string(),
            preview_url: None,
        };
        let rows = home_rows(std::slice::from_ref(&live));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].primary, "After Hours");
    }

    #[test]
    fn unmatched_recommendations_are_muted() {
        let items = vec![EnrichedRecommendation {
            recommendation: Recommendation {
                title: "Weightless".to_string(),
                artist: "Marconi Union".to_string(),
                reason: "Ultimate relaxation.".to_string(),
            },
            track: None,
        }];
        let rows = dj_rows(&items);
        assert!(rows[0].is_muted());
        assert_eq!(rows[0].primary, "Marconi Union - Weightless");
        assert_eq!(rows[0].detail, "not found");
    }

    #[test]
    fn greeting_follows_the_hour() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(17), "Good afternoon");
        assert_eq!(greeting(18), "Good evening");
        assert_eq!(greeting(23), "Good evening");
    }

    #[test]
    fn empty_query_browses_genres() {
        for state in [
            SessionState::Idle,
            SessionState::Disconnected,
            SessionState::NoResults,
        ] {
            assert_eq!(search_pane(state, "  "), SearchPane::Genres);
        }
        assert_eq!(GENRES.len(), 10);
        assert_eq!(GENRES[0], "Podcasts");
    }

    #[test]
    fn messages_quote_the_query() {
        assert_eq!(
            search_pane(SessionState::NoResults, " qwzx "),
            SearchPane::Message("No results found for \"qwzx\"".to_string())
        );
        assert_eq!(
            search_pane(SessionState::Idle, "ab"),
            SearchPane::Message("Type at least 3 characters".to_string())
        );
        assert_eq!(search_pane(SessionState::Results, "daft"), SearchPane::Results);
    }
}
