pub mod playback;
pub mod search;

pub use playback::{PlaybackController, PlaybackEvent, PlaybackPort, PlayerStatus, PortError};
pub use search::{RequestId, SearchCommand, SearchConfig, SearchController, SessionState};
