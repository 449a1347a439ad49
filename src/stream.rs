pub mod classifier;
pub mod context;
pub mod master;
pub mod processor;
pub mod rules;
pub mod state;

pub use classifier::{Line, LineClassifier, LineType};
pub use context::ParseContext;
pub use master::{MasterPlaylistParser, parse_master_playlist, parse_master_playlist_media};
pub use processor::{MediaPlaylistParser, parse_level_playlist};
pub use rules::{RuleTable, TagRule, default_rules};
pub use state::MediaState;
