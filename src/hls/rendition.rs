use std::collections::BTreeMap;

use serde::Serialize;

use super::attr_list::AttrList;

/// `TYPE` of an `EXT-X-MEDIA` rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MediaType {
    #[serde(rename = "AUDIO")]
    Audio,
    #[serde(rename = "VIDEO")]
    Video,
    #[serde(rename = "SUBTITLES")]
    Subtitles,
    #[serde(rename = "CLOSED-CAPTIONS")]
    ClosedCaptions,
}

impl MediaType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUDIO" => Some(Self::Audio),
            "VIDEO" => Some(Self::Video),
            "SUBTITLES" => Some(Self::Subtitles),
            "CLOSED-CAPTIONS" => Some(Self::ClosedCaptions),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
            Self::Video => "VIDEO",
            Self::Subtitles => "SUBTITLES",
            Self::ClosedCaptions => "CLOSED-CAPTIONS",
        }
    }
}

/// Renditions of a multivariant playlist grouped by media type.
pub type MediaGroups = BTreeMap<MediaType, Vec<Rendition>>;

/// An alternate rendition declared by `EXT-X-MEDIA`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rendition {
    pub id: usize,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub group_id: String,
    pub name: String,
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assoc_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instream_id: Option<String>,
    pub default: bool,
    pub autoselect: bool,
    pub forced: bool,
    /// Resolved URI, empty when the rendition has none (e.g. muxed audio).
    pub url: String,
    pub audio_codec: Option<String>,
    pub text_codec: Option<String>,
    pub attrs: AttrList,
}

impl Rendition {
    pub fn new(id: usize, media_type: MediaType, attrs: AttrList, url: String) -> Self {
        let owned = |name: &str| attrs.get(name).map(str::to_string);
        let lang = owned("LANGUAGE");

        Self {
            id,
            media_type,
            group_id: owned("GROUP-ID").unwrap_or_default(),
            name: owned("NAME").or_else(|| lang.clone()).unwrap_or_default(),
            assoc_lang: owned("ASSOC-LANGUAGE"),
            channels: owned("CHANNELS"),
            characteristics: owned("CHARACTERISTICS"),
            instream_id: owned("INSTREAM-ID"),
            default: attrs.bool("DEFAULT"),
            autoselect: attrs.bool("AUTOSELECT"),
            forced: attrs.bool("FORCED"),
            lang,
            url,
            audio_codec: None,
            text_codec: None,
            attrs,
        }
    }
}
