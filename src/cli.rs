use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use hls_playlist::hls::PlaylistLevelType;

#[derive(Parser)]
#[command(name = "hls-playlist")]
#[command(author, version, about = "Parse HLS playlists and print them as JSON")]
pub struct Cli {
    /// URL the playlist was loaded from, used to resolve relative URIs.
    /// Defaults to the file:// URL of the input.
    #[arg(short, long, global = true, env = "HLS_BASE_URL")]
    pub base_url: Option<String>,

    /// Pretty-print the JSON output
    #[arg(short, long, global = true)]
    pub pretty: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a multivariant playlist
    Master {
        /// Playlist file, or `-` for stdin
        #[arg(required = true)]
        input: PathBuf,
    },

    /// List the EXT-X-MEDIA renditions of a multivariant playlist
    Media {
        /// Playlist file, or `-` for stdin
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Parse a media playlist
    Level {
        /// Playlist file, or `-` for stdin
        #[arg(required = true)]
        input: PathBuf,

        /// Level index recorded on every fragment
        #[arg(long, default_value_t = 0)]
        level_id: usize,

        /// Kind of rendition the playlist belongs to
        #[arg(long = "type", value_enum, default_value_t = LevelKind::Main)]
        level_type: LevelKind,

        /// Sequence number of the first segment when the playlist has no
        /// EXT-X-MEDIA-SEQUENCE
        #[arg(long, default_value_t = 0)]
        start_sn: u64,

        /// Multivariant playlist whose variables serve EXT-X-DEFINE:IMPORT
        #[arg(long)]
        master: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LevelKind {
    Main,
    Audio,
    Subtitle,
}

impl From<LevelKind> for PlaylistLevelType {
    fn from(kind: LevelKind) -> Self {
        match kind {
            LevelKind::Main => Self::Main,
            LevelKind::Audio => Self::Audio,
            LevelKind::Subtitle => Self::Subtitle,
        }
    }
}
