use crate::wire::{NewReleasesResponse, SearchResponse};
use crate::{Catalog, CatalogError, CatalogResult};
use async_trait::async_trait;
use lumina_core::{urls, CatalogConfig, Session};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct SpotifyCatalog {
    http: reqwest::Client,
    session: Arc<Session>,
    cfg: CatalogConfig,
}

impl SpotifyCatalog {
    pub fn new(session: Arc<Session>, cfg: CatalogConfig) -> Result<Self, CatalogError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(Self { http, session, cfg })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        if !self.session.has_valid_token() {
            return Err(CatalogError::Unauthenticated);
        }
        let token = self.session.token().ok_or(CatalogError::Unauthenticated)?;

        let auth = match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(v) => v,
            Err(_) => {
                error!("stored token is not a valid header value; clearing session");
                self.session.clear_token();
                return Err(CatalogError::MalformedToken);
            }
        };

        debug!(url, "catalog request");
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, auth)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(url, error = %e, "catalog transport failure");
                CatalogError::Transport(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("catalog session expired; token cleared");
            self.session.clear_token();
            return Err(CatalogError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "catalog api error");
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            error!(url, error = %e, "catalog response decode failure");
            CatalogError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn search_tracks(&self, query: &str) -> CatalogResult {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let url = urls::track_search_url(&self.cfg.api_base, query, self.cfg.search_limit);
        let data: SearchResponse = self.fetch(&url).await?;
        Ok(data.into_tracks(&self.cfg.placeholder_cover))
    }

    async fn new_releases(&self) -> CatalogResult {
        let url = urls::new_releases_url(&self.cfg.api_base, self.cfg.new_releases_limit);
        let data: NewReleasesResponse = self.fetch(&url).await?;
        Ok(data.into_tracks(&self.cfg.placeholder_cover))
    }
}
