//! Session-aware search controller.
//!
//! Pure state machine: the caller feeds it query edits, clock ticks and catalog
//! replies, and executes the [`SearchCommand`]s it hands back. Connectivity is
//! always reconciled to [`Session::has_valid_token`]; the cached flag is never
//! trusted across a reply.

use lumina_catalog::CatalogResult;
use lumina_core::{ConfigIntervals, Session, Track};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand {
    Search { request: RequestId, query: String },
    LoadReleases { request: RequestId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Idle,
    Searching,
    Results,
    NoResults,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce: Duration,
    pub liveness_interval: Duration,
    /// Queries with fewer trimmed characters never reach the catalog.
    pub min_query_chars: usize,
}

impl SearchConfig {
    pub fn from_intervals(intervals: &ConfigIntervals) -> Self {
        Self {
            debounce: Duration::from_millis(intervals.search_debounce_ms),
            liveness_interval: Duration::from_millis(intervals.liveness_poll_ms),
            ..Self::default()
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            liveness_interval: Duration::from_secs(2),
            min_query_chars: 3,
        }
    }
}

#[derive(Debug)]
struct PendingSearch {
    due: Instant,
    query: String,
}

pub struct SearchController {
    cfg: SearchConfig,
    session: Arc<Session>,
    connected: bool,
    query: String,
    results: Vec<Track>,
    resolved_query: Option<String>,
    releases: Vec<Track>,
    pending: Option<PendingSearch>,
    next_request: u64,
    inflight_search: Option<(RequestId, String)>,
    inflight_releases: Option<RequestId>,
    next_liveness_at: Instant,
}

impl SearchController {
    pub fn new(cfg: SearchConfig, session: Arc<Session>, now: Instant) -> Self {
        let connected = session.has_valid_token();
        let next_liveness_at = now + cfg.liveness_interval;
        Self {
            cfg,
            session,
            connected,
            query: String::new(),
            results: Vec::new(),
            resolved_query: None,
            releases: Vec::new(),
            pending: None,
            next_request: 0,
            inflight_search: None,
            inflight_releases: None,
            next_liveness_at,
        }
    }

    pub fn update_config(&mut self, cfg: SearchConfig) {
        self.cfg = cfg;
    }

    /// Mount: a live session with nothing cached loads the home releases.
    pub fn start(&mut self, now: Instant) -> Vec<SearchCommand> {
        if self.connected {
            self.on_connected(now)
        } else {
            Vec::new()
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>, now: Instant) -> Vec<SearchCommand> {
        let query = query.into();
        if query == self.query {
            return Vec::new();
        }
        self.query = query;
        self.requery(now);
        self.load_releases_if_needed().into_iter().collect()
    }

    pub fn tick(&mut self, now: Instant) -> Vec<SearchCommand> {
        let mut commands = Vec::new();

        if now >= self.next_liveness_at {
            self.next_liveness_at = now + self.cfg.liveness_interval;
            commands.extend(self.reconcile(now));
        }

        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            if let Some(pending) = self.pending.take() {
                let request = self.issue();
                debug!(request = request.value(), query = %pending.query, "debounce elapsed; searching");
                self.inflight_search = Some((request, pending.query.clone()));
                commands.push(SearchCommand::Search {
                    request,
                    query: pending.query,
                });
            }
        }

        commands
    }

    pub fn apply_search(
        &mut self,
        request: RequestId,
        result: CatalogResult,
        now: Instant,
    ) -> Vec<SearchCommand> {
        match self.inflight_search.take() {
            Some((latest, query)) if latest == request => {
                match result {
                    Ok(tracks) => {
                        debug!(request = request.value(), count = tracks.len(), "search resolved");
                        self.results = tracks;
                    }
                    Err(err) => {
                        debug!(request = request.value(), error = %err, "search failed");
                        self.results.clear();
                    }
                }
                self.resolved_query = Some(query);
            }
            other => {
                debug!(request = request.value(), "discarding stale search reply");
                self.inflight_search = other;
            }
        }
        self.reconcile(now)
    }

    pub fn apply_releases(
        &mut self,
        request: RequestId,
        result: CatalogResult,
        now: Instant,
    ) -> Vec<SearchCommand> {
        if self.inflight_releases == Some(request) {
            self.inflight_releases = None;
            match result {
                Ok(tracks) if !tracks.is_empty() => {
                    debug!(count = tracks.len(), "new releases loaded");
                    self.releases = tracks;
                }
                Ok(_) => debug!("new releases empty"),
                Err(err) => debug!(error = %err, "new releases failed"),
            }
        } else {
            debug!(request = request.value(), "discarding stale releases reply");
        }
        self.reconcile(now)
    }

    /// Manual token entry. Blank input is ignored.
    pub fn connect(&mut self, raw_token: &str, now: Instant) -> Vec<SearchCommand> {
        let raw = raw_token.trim();
        if raw.is_empty() {
            return Vec::new();
        }
        self.session.set_token(raw);
        if !self.session.has_valid_token() {
            warn!("entered token is not a usable access token");
        }
        self.reconcile(now)
    }

    pub fn disconnect(&mut self) {
        self.session.clear_token();
        if self.connected {
            info!("catalog session disconnected");
        }
        self.connected = false;
        self.drop_session_data();
    }

    pub fn state(&self) -> SessionState {
        if !self.connected {
            return SessionState::Disconnected;
        }
        if self.pending.is_some() || self.inflight_search.is_some() {
            return SessionState::Searching;
        }
        match &self.resolved_query {
            Some(q) if *q == self.query && self.qualifies(&self.query) => {
                if self.results.is_empty() {
                    SessionState::NoResults
                } else {
                    SessionState::Results
                }
            }
            _ => SessionState::Idle,
        }
    }

    /// When the caller should tick next.
    pub fn next_deadline(&self) -> Instant {
        match &self.pending {
            Some(p) => p.due.min(self.next_liveness_at),
            None => self.next_liveness_at,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_loading(&self) -> bool {
        self.inflight_search.is_some()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Track] {
        &self.results
    }

    pub fn releases(&self) -> &[Track] {
        &self.releases
    }

    fn qualifies(&self, query: &str) -> bool {
        self.connected && query.trim().chars().count() >= self.cfg.min_query_chars
    }

    fn issue(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn requery(&mut self, now: Instant) {
        if self.qualifies(&self.query) {
            debug!(query = %self.query, "search scheduled");
            self.pending = Some(PendingSearch {
                due: now + self.cfg.debounce,
                query: self.query.clone(),
            });
        } else {
            self.pending = None;
            self.inflight_search = None;
            self.results.clear();
            self.resolved_query = None;
        }
    }

    fn load_releases_if_needed(&mut self) -> Option<SearchCommand> {
        if !self.connected
            || !self.query.trim().is_empty()
            || !self.releases.is_empty()
            || self.inflight_releases.is_some()
        {
            return None;
        }
        let request = self.issue();
        self.inflight_releases = Some(request);
        Some(SearchCommand::LoadReleases { request })
    }

    fn on_connected(&mut self, now: Instant) -> Vec<SearchCommand> {
        self.requery(now);
        self.load_releases_if_needed().into_iter().collect()
    }

    fn reconcile(&mut self, now: Instant) -> Vec<SearchCommand> {
        let valid = self.session.has_valid_token();
        if valid == self.connected {
            return Vec::new();
        }
        self.connected = valid;
        if valid {
            info!("catalog session live");
            self.on_connected(now)
        } else {
            warn!("catalog session expired");
            self.drop_session_data();
            Vec::new()
        }
    }

    fn drop_session_data(&mut self) {
        self.results.clear();
        self.releases.clear();
        self.resolved_query = None;
        self.pending = None;
        self.inflight_search = None;
        self.inflight_releases = None;
    }
}
