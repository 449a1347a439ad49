use serde::{Serialize, Serializer};

/// Playlist violations and value-level decoding failures.
///
/// Parsing never returns these as `Err`: builders record the first one in
/// `playlist_parsing_error` and keep going. The `Display` text of each
/// variant is the message reported to callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Missing format identifier #EXTM3U")]
    MissingFormatIdentifier,

    #[error("no EXTM3U delimiter")]
    MissingDelimiter,

    #[error("no levels found in manifest")]
    NoLevelsFound,

    #[error("#EXT-{tag} must not appear more than once ({line})")]
    MultipleTagOccurrence { tag: String, line: String },

    #[error("#EXT-{tag} must appear before the first Media Segment ({line})")]
    TagAfterFirstSegment { tag: String, line: String },

    #[error("EXT-X-DEFINE duplicate Variable Name declarations: \"{0}\"")]
    DuplicateVariable(String),

    #[error("EXT-X-DEFINE IMPORT attribute not found in Multivariant Playlist: \"{0}\"")]
    ImportNotFound(String),

    #[error("EXT-X-DEFINE QUERYPARAM: \"{name}\" does not match any query parameter in URI: \"{url}\"")]
    QueryParamNotFound { name: String, url: String },

    #[error("Missing preceding EXT-X-DEFINE tag for Variable Reference: \"{0}\"")]
    MissingVariable(String),

    #[error("Invalid byte range format: {0}")]
    InvalidByteRange(String),

    #[error("Invalid hexadecimal sequence: {0}")]
    InvalidHex(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Self::InvalidHex(e.to_string())
    }
}

impl From<chrono::ParseError> for Error {
    fn from(e: chrono::ParseError) -> Self {
        Self::InvalidDate(e.to_string())
    }
}
