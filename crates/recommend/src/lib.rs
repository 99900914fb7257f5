use async_trait::async_trait;
use futures_util::future::join_all;
use lumina_catalog::{first_match, Catalog};
use lumina_core::{EnrichedRecommendation, Recommendation};
use thiserror::Error;
use tracing::{debug, info};

mod gemini;

pub use gemini::GeminiRecommender;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("no generative service API key configured")]
    MissingApiKey,
    #[error("invalid generative service endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("generative service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generative service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generative service reply is not a recommendation list: {0}")]
    Malformed(String),
}

/// Produces recommendations for a mood. Implementations never fail; errors turn
/// into [`fallback_recommendations`].
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, mood: &str) -> Vec<Recommendation>;
}

pub fn fallback_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            title: "Midnight City".to_string(),
            artist: "M83".to_string(),
            reason: "Perfect for late night vibes.".to_string(),
        },
        Recommendation {
            title: "Weightless".to_string(),
            artist: "Marconi Union".to_string(),
            reason: "Ultimate relaxation.".to_string(),
        },
    ]
}

/// Looks every recommendation up in the catalog concurrently and attaches the
/// first hit. Order is preserved.
pub async fn enrich(
    catalog: &dyn Catalog,
    recommendations: Vec<Recommendation>,
) -> Vec<EnrichedRecommendation> {
    let lookups = recommendations.into_iter().map(|rec| async move {
        let query = format!("{} {}", rec.title, rec.artist);
        let track = first_match(catalog, &query).await;
        if track.is_none() {
            debug!(query = %query, "no catalog match for recommendation");
        }
        EnrichedRecommendation {
            recommendation: rec,
            track,
        }
    });
    join_all(lookups).await
}

pub async fn ask_dj(
    recommender: &dyn Recommender,
    catalog: &dyn Catalog,
    mood: &str,
) -> Vec<EnrichedRecommendation> {
    let mood = mood.trim();
    if mood.is_empty() {
        return Vec::new();
    }
    let recommendations = recommender.recommend(mood).await;
    let enriched = enrich(catalog, recommendations).await;
    info!(
        mood,
        total = enriched.len(),
        playable = enriched
            .iter()
            .filter(|r| r.track.as_ref().is_some_and(|t| t.is_playable()))
            .count(),
        "dj recommendations ready"
    );
    enriched
}

#[cfg(test)]
mod tests {
    use super::{ask_dj, enrich, fallback_recommendations, Recommender};
    use async_trait::async_trait;
    use lumina_catalog::{Catalog, CatalogError, CatalogResult};
    use lumina_core::{Recommendation, Track};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn search_tracks(&self, query: &str) -> CatalogResult {
            self.queries.lock().expect("lock").push(query.to_string());
            if query.starts_with("Midnight City") {
                Ok(vec![
                    track("m83-1", Some("https://p.scdn.co/mp3-preview/m83")),
                    track("m83-2", None),
                ])
            } else if query.starts_with("Broken") {
                Err(CatalogError::Transport("connection reset".to_string()))
            } else {
                Ok(Vec::new())
            }
        }

        async fn new_releases(&self) -> CatalogResult {
            Ok(Vec::new())
        }
    }

    struct FixedRecommender {
        calls: AtomicUsize,
        list: Vec<Recommendation>,
    }

    #[async_trait]
    impl Recommender for FixedRecommender {
        async fn recommend(&self, _mood: &str) -> Vec<Recommendation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.list.clone()
        }
    }

    fn track(id: &str, preview: Option<&str>) -> Track {
        Track {
            id: id.to_string(),
            title: "Midnight City".to_string(),
            artist: "M83".to_string(),
            album: "Hurry Up, We're Dreaming".to_string(),
            duration: "4:03".to_string(),
            cover_url: "https://picsum.photos/200/200".to_string(),
            preview_url: preview.map(str::to_string),
        }
    }

    fn rec(title: &str, artist: &str) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            artist: artist.to_string(),
            reason: "fits".to_string(),
        }
    }

    #[test]
    fn fallback_has_two_fixed_entries() {
        let list = fallback_recommendations();
        let titles: Vec<&str> = list.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Midnight City", "Weightless"]);
    }

    #[tokio::test]
    async fn enrich_attaches_first_hit_and_marks_misses() {
        let catalog = FakeCatalog::default();
        let out = enrich(
            &catalog,
            vec![
                rec("Midnight City", "M83"),
                rec("Weightless", "Marconi Union"),
                rec("Broken", "Nobody"),
            ],
        )
        .await;

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].track.as_ref().map(|t| t.id.as_str()), Some("m83-1"));
        assert!(out[1].track.is_none());
        assert!(out[2].track.is_none());
        assert_eq!(out[1].recommendation.title, "Weightless");

        let mut queries = catalog.queries.lock().expect("lock").clone();
        queries.sort();
        assert_eq!(
            queries,
            vec!["Broken Nobody", "Midnight City M83", "Weightless Marconi Union"]
        );
    }

    #[tokio::test]
    async fn blank_mood_skips_every_call() {
        let catalog = FakeCatalog::default();
        let recommender = FixedRecommender {
            calls: AtomicUsize::new(0),
            list: fallback_recommendations(),
        };

        assert!(ask_dj(&recommender, &catalog, "   ").await.is_empty());
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 0);
        assert!(catalog.queries.lock().expect("lock").is_empty());

        let out = ask_dj(&recommender, &catalog, "late night drive").await;
        assert_eq!(out.len(), 2);
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 1);
    }
}
