pub mod config;
pub mod model;
pub mod session;
pub mod urls;

pub use config::{AppConfig, CatalogConfig, ConfigIntervals, PlayerConfig, RecommendConfig};
pub use model::{EnrichedRecommendation, Recommendation, Track};
pub use session::{FileTokenStorage, MemoryTokenStorage, Session, TokenStorage};
