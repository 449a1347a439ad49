pub mod error;
pub mod hls;
pub mod stream;

pub use error::Error;
pub use stream::{parse_level_playlist, parse_master_playlist, parse_master_playlist_media};

pub type Result<T> = std::result::Result<T, Error>;
