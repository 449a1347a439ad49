/// Represents the type of a line in an M3U8 playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    Empty,
    ExtM3U,
    ExtInf,
    // Multivariant playlist tags
    ExtXStreamInf,
    ExtXIFrameStreamInf,
    ExtXMedia,
    ExtXSessionData,
    ExtXSessionKey,
    ExtXContentSteering,
    // Tags valid in either playlist kind
    ExtXDefine,
    ExtXStart,
    ExtXIndependentSegments,
    ExtXVersion,
    // Media playlist tags
    ExtXTargetDuration,
    ExtXMediaSequence,
    ExtXDiscontinuitySequence,
    ExtXPlaylistType,
    ExtXEndList,
    ExtXKey,
    ExtXMap,
    ExtXByteRange,
    ExtXBitrate,
    ExtXDiscontinuity,
    ExtXGap,
    ExtXProgramDateTime,
    ExtXDateRange,
    ExtXPartInf,
    ExtXPart,
    ExtXPreloadHint,
    ExtXServerControl,
    ExtXRenditionReport,
    ExtXSkip,
    UnknownExtTag,
    Comment,
    Uri,
}

impl LineType {
    /// Classify a tag by its name (text between `#` and `:`).
    fn from_tag_name(name: &str) -> Self {
        match name {
            "EXTM3U" => Self::ExtM3U,
            "EXTINF" => Self::ExtInf,
            "EXT-X-STREAM-INF" => Self::ExtXStreamInf,
            "EXT-X-I-FRAME-STREAM-INF" => Self::ExtXIFrameStreamInf,
            "EXT-X-MEDIA" => Self::ExtXMedia,
            "EXT-X-SESSION-DATA" => Self::ExtXSessionData,
            "EXT-X-SESSION-KEY" => Self::ExtXSessionKey,
            "EXT-X-CONTENT-STEERING" => Self::ExtXContentSteering,
            "EXT-X-DEFINE" => Self::ExtXDefine,
            "EXT-X-START" => Self::ExtXStart,
            "EXT-X-INDEPENDENT-SEGMENTS" => Self::ExtXIndependentSegments,
            "EXT-X-VERSION" => Self::ExtXVersion,
            "EXT-X-TARGETDURATION" => Self::ExtXTargetDuration,
            "EXT-X-MEDIA-SEQUENCE" => Self::ExtXMediaSequence,
            "EXT-X-DISCONTINUITY-SEQUENCE" => Self::ExtXDiscontinuitySequence,
            "EXT-X-PLAYLIST-TYPE" => Self::ExtXPlaylistType,
            "EXT-X-ENDLIST" => Self::ExtXEndList,
            "EXT-X-KEY" => Self::ExtXKey,
            "EXT-X-MAP" => Self::ExtXMap,
            "EXT-X-BYTERANGE" => Self::ExtXByteRange,
            "EXT-X-BITRATE" => Self::ExtXBitrate,
            "EXT-X-DISCONTINUITY" => Self::ExtXDiscontinuity,
            "EXT-X-GAP" => Self::ExtXGap,
            "EXT-X-PROGRAM-DATE-TIME" => Self::ExtXProgramDateTime,
            "EXT-X-DATERANGE" => Self::ExtXDateRange,
            "EXT-X-PART-INF" => Self::ExtXPartInf,
            "EXT-X-PART" => Self::ExtXPart,
            "EXT-X-PRELOAD-HINT" => Self::ExtXPreloadHint,
            "EXT-X-SERVER-CONTROL" => Self::ExtXServerControl,
            "EXT-X-RENDITION-REPORT" => Self::ExtXRenditionReport,
            "EXT-X-SKIP" => Self::ExtXSkip,
            _ if name.starts_with("EXT") => Self::UnknownExtTag,
            _ => Self::Comment,
        }
    }
}

/// One classified playlist line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub kind: LineType,
    /// The line with leading whitespace removed. Trailing whitespace is kept
    /// because it is significant in an EXTINF title.
    pub text: &'a str,
    /// Tag name without the leading `#`; empty for URIs and blank lines.
    pub name: &'a str,
    /// Text after the tag's first `:`, trailing whitespace removed. For a URI
    /// line, the trimmed URI.
    pub value: Option<&'a str>,
}

impl Line<'_> {
    /// The full line as it should appear in messages.
    pub fn trimmed(&self) -> &str {
        self.text.trim_end()
    }
}

/// Classifier for M3U8 lines.
pub struct LineClassifier;

impl LineClassifier {
    /// Classify a line from an M3U8 playlist.
    pub fn classify(line: &str) -> LineType {
        Self::scan_line(line).kind
    }

    /// Split a line into its kind, tag name and value.
    pub fn scan_line(line: &str) -> Line<'_> {
        let text = line.trim_start();
        let trimmed = text.trim_end();

        if trimmed.is_empty() {
            return Line { kind: LineType::Empty, text, name: "", value: None };
        }

        let Some(tag) = trimmed.strip_prefix('#') else {
            return Line { kind: LineType::Uri, text, name: "", value: Some(trimmed) };
        };

        let (name, value) = match tag.split_once(':') {
            Some((name, value)) => (name.trim_end(), Some(value.trim_end())),
            None => (tag, None),
        };

        Line { kind: LineType::from_tag_name(name), text, name, value }
    }

    /// Iterate over the classified lines of a playlist.
    pub fn lines(input: &str) -> impl Iterator<Item = Line<'_>> {
        input.split(['\n', '\r']).map(Self::scan_line)
    }
}
