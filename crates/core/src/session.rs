//! Bearer-token credential store.
//!
//! A [`Session`] is shared as `Arc<Session>` between the catalog client and the
//! search controller. Any holder may clear it (explicit disconnect, or a 401 seen
//! by a catalog call), so readers re-check it instead of caching the answer.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Tokens at or below this length are never considered valid.
pub const MIN_TOKEN_LEN: usize = 20;

pub fn sanitize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        return None;
    }
    let clean: String = trimmed.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    if clean.is_empty() {
        None
    } else {
        Some(clean)
    }
}

pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn remove(&self);
}

impl<T: TokenStorage + ?Sized> TokenStorage for std::sync::Arc<T> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn store(&self, token: &str) {
        (**self).store(token)
    }

    fn remove(&self) {
        (**self).remove()
    }
}

/// Persists the token as the sole contents of one file.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Some(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read stored token");
                None
            }
        }
    }

    fn store(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %err, "failed to create token directory");
                return;
            }
        }
        if let Err(err) = std::fs::write(&self.path, token) {
            warn!(path = %self.path.display(), error = %err, "failed to persist token");
        }
    }

    fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove stored token");
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryTokenStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
        }
    }

    pub fn stored(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.stored()
    }

    fn store(&self, token: &str) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
    }

    fn remove(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

pub struct Session {
    storage: Box<dyn TokenStorage>,
    token: RwLock<Option<String>>,
}

impl Session {
    /// Restores whatever token the storage holds; sentinel values load as absent.
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        let token = storage.load().as_deref().and_then(sanitize_token);
        debug!(restored = token.is_some(), "session initialised");
        Self {
            storage,
            token: RwLock::new(token),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryTokenStorage::new()))
    }

    pub fn set_token(&self, raw: &str) {
        match sanitize_token(raw) {
            Some(clean) => {
                self.storage.store(&clean);
                *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(clean);
            }
            None => self.clear_token(),
        }
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.storage.remove();
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_deref()
            .and_then(sanitize_token)
    }

    pub fn has_valid_token(&self) -> bool {
        self.token()
            .map(|t| t.len() > MIN_TOKEN_LEN)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("has_valid_token", &self.has_valid_token())
            .finish()
    }
}
