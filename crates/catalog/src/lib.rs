use async_trait::async_trait;
use lumina_core::Track;
use thiserror::Error;

mod spotify;
mod wire;

pub use spotify::SpotifyCatalog;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no valid access token; request not sent")]
    Unauthenticated,
    #[error("access token rejected by the catalog; session cleared")]
    AuthExpired,
    #[error("access token cannot be sent as a header; session cleared")]
    MalformedToken,
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("catalog request failed: {0}")]
    Transport(String),
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl CatalogError {
    /// The session is (or became) unusable; the caller should re-check liveness.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CatalogError::Unauthenticated | CatalogError::AuthExpired | CatalogError::MalformedToken
        )
    }
}

pub type CatalogResult = Result<Vec<Track>, CatalogError>;

#[async_trait]
pub trait Catalog: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search_tracks(&self, query: &str) -> CatalogResult;
    async fn new_releases(&self) -> CatalogResult;
}

/// Search and keep only the first hit; failures count as "not found".
pub async fn first_match(catalog: &dyn Catalog, query: &str) -> Option<Track> {
    match catalog.search_tracks(query).await {
        Ok(tracks) => tracks.into_iter().next(),
        Err(err) => {
            tracing::debug!(query, error = %err, "lookup failed");
            None
        }
    }
}
