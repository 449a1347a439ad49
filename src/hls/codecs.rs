use serde::Serialize;

const VIDEO_SAMPLE_ENTRIES: &[&str] = &[
    "avc1", "avc2", "avc3", "avc4", "avcp", "av01", "dav1", "drac", "dva1", "dvav", "dvh1",
    "dvhe", "encv", "hev1", "hvc1", "mjp2", "mp4v", "mvc1", "mvc2", "mvc3", "mvc4", "resv",
    "rv60", "s263", "svc1", "svc2", "vc-1", "vp08", "vp09",
];

const AUDIO_SAMPLE_ENTRIES: &[&str] = &[
    "a3ds", "ac-3", "ac-4", "alac", "alaw", "dra1", "dts+", "dts-", "dtsc", "dtse", "dtsh",
    "ec-3", "enca", "fLaC", "flac", "FLAC", "g719", "g726", "m4ae", "mha1", "mha2", "mhm1",
    "mhm2", "mlpa", "mp4a", "raw ", "Opus", "opus", "samr", "sawb", "sawp", "sevc", "sqcp",
    "ssmv", "twos", "ulaw",
];

const TEXT_SAMPLE_ENTRIES: &[&str] = &["stpp", "wvtt"];

/// Media kind of a codec, decided by its ISO sample-entry code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    Video,
    Audio,
    Text,
}

impl CodecType {
    /// Classify a codec string by its first four characters.
    pub fn of(codec: &str) -> Option<Self> {
        let entry = codec.get(..4)?;
        if VIDEO_SAMPLE_ENTRIES.contains(&entry) {
            Some(Self::Video)
        } else if AUDIO_SAMPLE_ENTRIES.contains(&entry) {
            Some(Self::Audio)
        } else if TEXT_SAMPLE_ENTRIES.contains(&entry) {
            Some(Self::Text)
        } else {
            None
        }
    }
}

/// Codec list of a variant split by media kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_codec: Option<String>,
    pub unknown_codecs: Vec<String>,
}

impl CodecSet {
    /// Split a `CODECS` value. Each entry loses any `/brand` suffix.
    pub fn parse(value: Option<&str>) -> Self {
        let mut remaining: Vec<&str> = value
            .unwrap_or("")
            .split([' ', ','])
            .filter(|c| !c.is_empty())
            .collect();
        let mut set = Self::default();

        for kind in [CodecType::Video, CodecType::Audio, CodecType::Text] {
            let (matched, rest): (Vec<&str>, Vec<&str>) = remaining
                .into_iter()
                .partition(|codec| CodecType::of(codec) == Some(kind));
            remaining = rest;
            if matched.is_empty() {
                continue;
            }
            let joined = matched
                .iter()
                .map(|c| c.split('/').next().unwrap_or(c))
                .collect::<Vec<_>>()
                .join(",");
            match kind {
                CodecType::Video => set.video_codec = Some(joined),
                CodecType::Audio => set.audio_codec = Some(joined),
                CodecType::Text => set.text_codec = Some(joined),
            }
        }

        set.unknown_codecs = remaining.into_iter().map(str::to_string).collect();
        set
    }

    pub fn has_unknown_codecs(&self) -> bool {
        !self.unknown_codecs.is_empty()
    }
}
