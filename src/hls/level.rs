use serde::Serialize;

use super::{attr_list::AttrList, codecs::CodecSet};

/// A variant stream declared by `EXT-X-STREAM-INF`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub attrs: AttrList,
    pub bitrate: u64,
    pub name: Option<String>,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(flatten)]
    pub codecs: CodecSet,
    /// Breakdown of `SUPPLEMENTAL-CODECS`, brands removed.
    pub supplemental: Option<CodecSet>,
}

impl Level {
    /// Build a level from its (already substituted) attributes and resolved URL.
    pub fn new(attrs: AttrList, url: String) -> Self {
        let bitrate = attrs
            .decimal_integer("BANDWIDTH")
            .filter(|b| *b > 0)
            .or_else(|| attrs.decimal_integer("AVERAGE-BANDWIDTH"))
            .unwrap_or(0);
        let resolution = attrs.decimal_resolution("RESOLUTION");
        let codecs = CodecSet::parse(attrs.get("CODECS"));
        let supplemental = attrs
            .get("SUPPLEMENTAL-CODECS")
            .filter(|s| !s.is_empty())
            .map(|s| CodecSet::parse(Some(s)));

        Self {
            bitrate,
            name: attrs.get("NAME").map(str::to_string),
            url,
            width: resolution.map(|r| r.width),
            height: resolution.map(|r| r.height),
            codecs,
            supplemental,
            attrs,
        }
    }

    pub fn video_codec(&self) -> Option<&str> {
        self.codecs.video_codec.as_deref()
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.codecs.audio_codec.as_deref()
    }

    pub fn text_codec(&self) -> Option<&str> {
        self.codecs.text_codec.as_deref()
    }

    pub fn average_bitrate(&self) -> Option<u64> {
        self.attrs.decimal_integer("AVERAGE-BANDWIDTH")
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.attrs.decimal_floating_point("FRAME-RATE")
    }

    pub fn audio_group_id(&self) -> Option<&str> {
        self.attrs.get("AUDIO")
    }

    pub fn text_group_id(&self) -> Option<&str> {
        self.attrs.get("SUBTITLES")
    }
}
