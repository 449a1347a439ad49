use std::collections::BTreeMap;

use super::{
    classifier::{LineClassifier, LineType},
    context::ParseContext,
};
use crate::{
    Error,
    hls::{
        AttrList, ContentSteering, Level, MasterPlaylist, MediaGroups, MediaType, Rendition,
    },
};

/// Builder for multivariant playlists.
pub struct MasterPlaylistParser {
    context: ParseContext,
    playlist: MasterPlaylist,
    /// Attributes of a STREAM-INF still waiting for its URI.
    pending_variant: Option<AttrList>,
}

impl MasterPlaylistParser {
    pub fn new(base_url: &str, text: &str) -> Self {
        Self {
            context: ParseContext::new(base_url, text),
            playlist: MasterPlaylist::default(),
            pending_variant: None,
        }
    }

    pub fn parse(mut self, text: &str) -> MasterPlaylist {
        let mut lines = LineClassifier::lines(text).filter(|l| l.kind != LineType::Empty);
        let first = lines.next();
        if first.is_none_or(|l| l.kind != LineType::ExtM3U) {
            self.context.report(Error::MissingDelimiter);
        }

        for line in first.into_iter().chain(lines) {
            let value = line.value.unwrap_or_default();
            match line.kind {
                LineType::ExtXStreamInf => {
                    self.pending_variant = Some(self.context.attrs(value));
                }
                LineType::Uri => {
                    if let Some(attrs) = self.pending_variant.take() {
                        let uri = self.context.substitute(value);
                        let url = self.context.resolve(&uri);
                        self.playlist.levels.push(Level::new(attrs, url));
                    }
                }
                LineType::ExtXSessionData => self.session_data(value),
                LineType::ExtXSessionKey => self.session_key(value),
                LineType::ExtXDefine => {
                    let attrs = self.context.attrs(value);
                    self.context.define(&attrs, None);
                }
                LineType::ExtXContentSteering => {
                    let attrs = self.context.attrs(value);
                    self.playlist.content_steering = Some(ContentSteering {
                        uri: self.context.resolve(attrs.get("SERVER-URI").unwrap_or_default()),
                        pathway_id: attrs.get("PATHWAY-ID").unwrap_or(".").to_string(),
                    });
                }
                LineType::ExtXStart => {
                    self.playlist.start_time_offset =
                        AttrList::parse(value).decimal_floating_point("TIME-OFFSET");
                }
                _ => {}
            }
        }

        self.finish()
    }

    fn session_data(&mut self, value: &str) {
        let attrs = self.context.attrs(value);
        let Some(data_id) = attrs.get("DATA-ID").filter(|id| !id.is_empty()) else {
            return;
        };
        self.playlist
            .session_data
            .get_or_insert_with(BTreeMap::new)
            .insert(data_id.to_string(), attrs.clone());
    }

    fn session_key(&mut self, value: &str) {
        let key = self.context.parse_key(value);
        if key.encrypted() && key.is_supported() {
            self.playlist.session_keys.get_or_insert_with(Vec::new).push(key);
        } else {
            tracing::warn!("[Keys] Ignoring invalid EXT-X-SESSION-KEY tag: \"{}\"", value);
        }
    }

    fn finish(mut self) -> MasterPlaylist {
        // Drop variants with unrecognised codecs, unless that would drop all of them.
        let known = self
            .playlist
            .levels
            .iter()
            .filter(|level| !level.codecs.has_unknown_codecs())
            .count();
        if known > 0 && known < self.playlist.levels.len() {
            self.playlist
                .levels
                .retain(|level| !level.codecs.has_unknown_codecs());
        }

        if self.playlist.levels.is_empty() {
            self.context.replace_error(Error::NoLevelsFound);
        }

        self.playlist.variable_list = self.context.variables.take();
        self.playlist.has_variable_refs = self.context.has_variable_refs;
        self.playlist.playlist_parsing_error = self.context.take_error();
        self.playlist
    }
}

/// Parse a multivariant playlist.
pub fn parse_master_playlist(text: &str, base_url: &str) -> MasterPlaylist {
    MasterPlaylistParser::new(base_url, text).parse(text)
}

/// Collect the `EXT-X-MEDIA` renditions of a multivariant playlist, grouped
/// by type, using the variables of the already parsed `master`.
pub fn parse_master_playlist_media(text: &str, base_url: &str, master: &MasterPlaylist) -> MediaGroups {
    let mut context = ParseContext::new(base_url, text);
    context.variables = master.variable_list.clone();
    context.has_variable_refs |= master.has_variable_refs;

    let mut groups = MediaGroups::new();
    let mut id = 0;

    for line in LineClassifier::lines(text).filter(|l| l.kind == LineType::ExtXMedia) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        let Some(media_type) = attrs.get("TYPE").and_then(MediaType::parse) else {
            continue;
        };
        let url = attrs
            .get("URI")
            .map(|uri| context.resolve(uri))
            .unwrap_or_default();

        let mut rendition = Rendition::new(id, media_type, attrs, url);
        id += 1;
        assign_group_codec(&mut rendition, master);
        groups.entry(media_type).or_default().push(rendition);
    }

    if let Some(error) = context.error() {
        tracing::warn!("EXT-X-MEDIA: {}", error);
    }

    groups
}

/// Copy the codec of the variant referencing the rendition's group, or of
/// the first variant when no variant references it.
fn assign_group_codec(rendition: &mut Rendition, master: &MasterPlaylist) {
    if !matches!(rendition.media_type, MediaType::Audio | MediaType::Subtitles) {
        return;
    }
    let Some(level) = master
        .levels
        .iter()
        .find(|level| group_of(level, rendition.media_type) == Some(rendition.group_id.as_str()))
        .or_else(|| master.levels.first())
    else {
        return;
    };

    match rendition.media_type {
        MediaType::Audio => {
            if let Some(codec) = level.audio_codec() {
                rendition.audio_codec = Some(codec.to_string());
            }
        }
        _ => {
            if let Some(codec) = level.text_codec() {
                rendition.text_codec = Some(codec.to_string());
            }
        }
    }
}

fn group_of(level: &Level, media_type: MediaType) -> Option<&str> {
    match media_type {
        MediaType::Audio => level.audio_group_id(),
        MediaType::Subtitles => level.text_group_id(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://www.dailymotion.com";

    #[test]
    fn test_empty_manifest() {
        let result = parse_master_playlist("", BASE);
        assert!(result.levels.is_empty());
        assert!(result.session_data.is_none());
        assert_eq!(result.playlist_parsing_error, Some(Error::NoLevelsFound));
    }

    #[test]
    fn test_broken_marker_reports_no_levels() {
        let manifest = "#EXTM3U\n#EXTXSTREAMINF:PROGRAM-ID=1, BANDWIDTH=392000\nhttp://proxy-21.dailymotion.com/sec(2a991e17f08fcd94f95637a6dd718ddd)/video/107/282/158282701_mp4_h264_aac_ld.m3u8#cell=core";
        let result = parse_master_playlist(manifest, BASE);
        assert!(result.levels.is_empty());
        assert_eq!(
            result.playlist_parsing_error.map(|e| e.to_string()),
            Some("no levels found in manifest".into())
        );
    }

    #[test]
    fn test_missing_delimiter_with_levels() {
        let result = parse_master_playlist("#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8", BASE);
        assert_eq!(result.levels.len(), 1);
        assert_eq!(result.playlist_parsing_error, Some(Error::MissingDelimiter));
    }

    #[test]
    fn test_levels() {
        let manifest = r#"#EXTM3U
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=836280,CODECS="mp4a.40.2,avc1.64001f",RESOLUTION=848x360,NAME="480"
http://proxy-62.dailymotion.com/sec(3ae40f708f79ca9471f52b86da76a3a8)/video/107/282/158282701_mp4_h264_aac_hq.m3u8#cell=core

# a comment between variants
#EXT-X-STREAM-INF:PROGRAM-ID=1,CODECS="mp4a.40.2,avc1.42001e",RESOLUTION=512x216,NAME="240",BANDWIDTH=246440
# comment before the URI
low/stream.m3u8"#;
        let result = parse_master_playlist(manifest, BASE);
        assert!(result.playlist_parsing_error.is_none());
        assert_eq!(result.levels.len(), 2);

        let hq = &result.levels[0];
        assert_eq!(hq.bitrate, 836280);
        assert_eq!(hq.audio_codec(), Some("mp4a.40.2"));
        assert_eq!(hq.video_codec(), Some("avc1.64001f"));
        assert_eq!(hq.width, Some(848));
        assert_eq!(hq.height, Some(360));
        assert_eq!(hq.name.as_deref(), Some("480"));
        assert_eq!(
            hq.url,
            "http://proxy-62.dailymotion.com/sec(3ae40f708f79ca9471f52b86da76a3a8)/video/107/282/158282701_mp4_h264_aac_hq.m3u8#cell=core"
        );

        let low = &result.levels[1];
        assert_eq!(low.bitrate, 246440);
        assert_eq!(low.url, "http://www.dailymotion.com/low/stream.m3u8");
    }

    #[test]
    fn test_unknown_codec_levels_are_dropped_when_others_remain() {
        let manifest = r#"#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1,CODECS="avc1.64001f"
a.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2,CODECS="foo.1"
b.m3u8"#;
        let result = parse_master_playlist(manifest, BASE);
        assert_eq!(result.levels.len(), 1);
        assert_eq!(result.levels[0].bitrate, 1);

        let only_unknown = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=2,CODECS=\"foo.1\"\nb.m3u8";
        assert_eq!(parse_master_playlist(only_unknown, BASE).levels.len(), 1);
    }

    #[test]
    fn test_session_data_last_write_wins() {
        let manifest = r#"#EXTM3U
#EXT-X-SESSION-DATA:DATA-ID="com.dailymotion.sessiondata.test",VALUE="some data"
#EXT-X-SESSION-DATA:DATA-ID="com.dailymotion.sessiondata.test",VALUE="other data"
#EXT-X-SESSION-DATA:DATA-ID="com.dailymotion.sessiondata.uri",URI="https://example.com/data.json"
#EXT-X-STREAM-INF:BANDWIDTH=1
a.m3u8"#;
        let result = parse_master_playlist(manifest, BASE);
        let data = result.session_data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data["com.dailymotion.sessiondata.test"].get("VALUE"), Some("other data"));
        assert_eq!(
            data["com.dailymotion.sessiondata.uri"].get("URI"),
            Some("https://example.com/data.json")
        );
    }

    #[test]
    fn test_session_keys() {
        let manifest = r#"#EXTM3U
#EXT-X-SESSION-KEY:METHOD=AES-128,URI="oceans.key"
#EXT-X-SESSION-KEY:METHOD=SAMPLE-AES,KEYFORMAT="com.apple.streamingkeydelivery",KEYFORMATVERSIONS="1/2",URI="skd://assetid?keyId=1234"
#EXT-X-SESSION-KEY:METHOD=NONE
#EXT-X-STREAM-INF:BANDWIDTH=1
a.m3u8"#;
        let result = parse_master_playlist(manifest, "https://example.com/master.m3u8");
        let keys = result.session_keys.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].uri, "https://example.com/oceans.key");
        assert_eq!(keys[0].key_format, "identity");
        assert_eq!(keys[1].uri, "skd://assetid?keyId=1234");
        assert_eq!(keys[1].key_format_versions, vec![1, 2]);
    }

    #[test]
    fn test_start_and_steering() {
        let manifest = r#"#EXTM3U
#EXT-X-START:TIME-OFFSET=-30.0
#EXT-X-CONTENT-STEERING:SERVER-URI="/steering?video=00012"
#EXT-X-STREAM-INF:BANDWIDTH=1
a.m3u8"#;
        let result = parse_master_playlist(manifest, "https://example.com/master.m3u8");
        assert_eq!(result.start_time_offset, Some(-30.0));
        assert_eq!(
            result.content_steering,
            Some(ContentSteering {
                uri: "https://example.com/steering?video=00012".into(),
                pathway_id: ".".into(),
            })
        );
    }

    #[test]
    fn test_variable_substitution() {
        let manifest = r#"#EXTM3U
#EXT-X-DEFINE:NAME="foo",VALUE="ok"
#EXT-X-DEFINE:NAME="bar",VALUE="{$foo}"
#EXT-X-DEFINE:QUERYPARAM="token"
#EXT-X-STREAM-INF:BANDWIDTH=1,CODECS="avc1.{$foo}",NAME="{$bar}"
{$foo}/index.m3u8?token={$token}"#;
        let result = parse_master_playlist(manifest, "https://www.x.com?foo=bar&a=ok&token=1234");
        assert!(result.playlist_parsing_error.is_none());
        assert!(result.has_variable_refs);
        let vars = result.variable_list.unwrap();
        assert_eq!(vars.get("bar"), Some("ok"));
        assert_eq!(vars.get("token"), Some("1234"));
        assert!(!vars.contains("a"));

        let level = &result.levels[0];
        assert_eq!(level.name.as_deref(), Some("ok"));
        assert_eq!(level.video_codec(), Some("avc1.ok"));
        assert_eq!(level.url, "https://www.x.com/ok/index.m3u8?token=1234");
    }

    #[test]
    fn test_duplicate_variable() {
        let manifest = r#"#EXTM3U
#EXT-X-DEFINE:NAME="foo",VALUE="ok"
#EXT-X-DEFINE:NAME="foo",VALUE="ok2"
#EXT-X-STREAM-INF:BANDWIDTH=1
{$foo}.m3u8"#;
        let result = parse_master_playlist(manifest, "http://example.com/");
        assert_eq!(
            result.playlist_parsing_error.map(|e| e.to_string()),
            Some("EXT-X-DEFINE duplicate Variable Name declarations: \"foo\"".into())
        );
        assert_eq!(result.levels[0].url, "http://example.com/ok.m3u8");
    }

    #[test]
    fn test_media_groups() {
        let manifest = r#"#EXTM3U
#EXT-X-DEFINE:NAME="lang",VALUE="en"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aac",LANGUAGE="{$lang}",NAME="English",AUTOSELECT=YES,DEFAULT=YES,URI="audio/{$lang}.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aac",LANGUAGE="fr",NAME="Francais",AUTOSELECT=YES,DEFAULT=NO,FORCED=YES,URI="audio/fr.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",LANGUAGE="en",NAME="English",URI="subs/en.m3u8"
#EXT-X-MEDIA:TYPE=CLOSED-CAPTIONS,GROUP-ID="cc",NAME="CC1",INSTREAM-ID="CC1"
#EXT-X-STREAM-INF:BANDWIDTH=1,CODECS="avc1.64001f,mp4a.40.5,wvtt",AUDIO="aac",SUBTITLES="subs"
a.m3u8"#;
        let base = "https://hls.ted.com/master.m3u8";
        let master = parse_master_playlist(manifest, base);
        let groups = parse_master_playlist_media(manifest, base, &master);

        let audio = &groups[&MediaType::Audio];
        assert_eq!(audio.len(), 2);
        assert_eq!(audio[0].id, 0);
        assert_eq!(audio[0].group_id, "aac");
        assert_eq!(audio[0].lang.as_deref(), Some("en"));
        assert_eq!(audio[0].url, "https://hls.ted.com/audio/en.m3u8");
        assert_eq!(audio[0].audio_codec.as_deref(), Some("mp4a.40.5"));
        assert!(audio[0].default && audio[0].autoselect && !audio[0].forced);
        assert!(audio[1].forced);

        let subs = &groups[&MediaType::Subtitles];
        assert_eq!(subs[0].text_codec.as_deref(), Some("wvtt"));

        let cc = &groups[&MediaType::ClosedCaptions];
        assert_eq!(cc[0].instream_id.as_deref(), Some("CC1"));
        assert_eq!(cc[0].url, "");
        assert_eq!(cc[0].id, 3);
        assert!(!groups.contains_key(&MediaType::Video));
    }

    #[test]
    fn test_group_codec_follows_referencing_variant() {
        let manifest = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="lo",NAME="Low",URI="lo.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="hi",NAME="High",URI="hi.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="orphan",NAME="Orphan",URI="orphan.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=1,CODECS="avc1.64001f,mp4a.40.5",AUDIO="lo"
a.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2,CODECS="avc1.64001f,ec-3",AUDIO="hi"
b.m3u8"#;
        let base = "https://example.com/master.m3u8";
        let master = parse_master_playlist(manifest, base);
        let groups = parse_master_playlist_media(manifest, base, &master);

        let audio = &groups[&MediaType::Audio];
        assert_eq!(audio[0].audio_codec.as_deref(), Some("mp4a.40.5"));
        assert_eq!(audio[1].audio_codec.as_deref(), Some("ec-3"));
        assert_eq!(audio[2].audio_codec.as_deref(), Some("mp4a.40.5"));
        assert_eq!(audio[2].text_codec, None);
    }
}
