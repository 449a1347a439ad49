use super::{Line, LineType, MediaState, ParseContext, TagRule};
use crate::hls::{ByteRange, attr_list::leading_float};

/// `#EXTINF:<duration>[,<title>]`.
pub struct ExtInfRule;

impl TagRule for ExtInfRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtInf]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        // The title keeps trailing whitespace, so read from the untrimmed text.
        let raw = line.text.split_once(':').map_or("", |(_, value)| value);
        let (duration, title) = match raw.split_once(',') {
            Some((duration, title)) => (duration, Some(title).filter(|t| !t.is_empty())),
            None => (raw.trim_end(), None),
        };
        let duration = numeric_prefix(duration);

        let frag = &mut state.frag;
        frag.duration = leading_float(duration).unwrap_or(0.0);
        frag.title = title.map(str::to_string);

        let mut entry = vec!["INF".to_string(), duration.to_string()];
        entry.extend(title.map(str::to_string));
        frag.tag_list.push(entry);
    }
}

/// `#EXT-X-BYTERANGE:<length>[@<offset>]`, resolved when the URI is seen.
pub struct ByteRangeRule;

impl TagRule for ByteRangeRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXByteRange]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        match ByteRange::parse(line.value.unwrap_or_default()) {
            Ok(range) => state.byte_range = Some(range),
            Err(e) => tracing::warn!("Ignoring {}: {}", line.trimmed(), e),
        }
    }
}

/// `#EXT-X-DISCONTINUITY`.
pub struct DiscontinuityRule;

impl TagRule for DiscontinuityRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXDiscontinuity]
    }

    fn apply(&self, _line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        state.cc = state.cc.saturating_add(1);
        state.frag.tag_list.push(vec!["DIS".to_string()]);
    }
}

/// Per-segment flags: `EXT-X-GAP` and the carried `EXT-X-BITRATE`.
pub struct SegmentFlagRule;

impl TagRule for SegmentFlagRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXGap, LineType::ExtXBitrate]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        match line.kind {
            LineType::ExtXGap => {
                state.frag.gap = true;
                state.frag.tag_list.push(vec!["GAP".to_string()]);
            }
            _ => {
                let value = line.value.unwrap_or_default();
                state.frag.tag_list.push(vec!["BITRATE".to_string(), value.to_string()]);
                match value.trim().parse::<u64>().ok().and_then(|kbps| kbps.checked_mul(1000)) {
                    Some(bitrate) => state.bitrate = Some(bitrate),
                    None => tracing::warn!("Ignoring invalid {}", line.trimmed()),
                }
            }
        }
    }
}

/// Tags without a typed field are kept verbatim on the fragment.
pub struct CustomTagRule;

impl TagRule for CustomTagRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::UnknownExtTag]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        let mut entry = vec![line.name.to_string()];
        entry.extend(line.value.map(str::to_string));
        state.frag.tag_list.push(entry);
    }
}

/// The `<digits>[.<digits>]` text at the start of `s`, after leading
/// whitespace. `.360` is accepted.
fn numeric_prefix(s: &str) -> &str {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(end) == Some(&b'.') {
        let fraction = bytes[end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if fraction > 0 {
            end += 1 + fraction;
        }
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::PlaylistLevelType;
    use crate::stream::classifier::LineClassifier;

    fn apply(rule: &dyn TagRule, state: &mut MediaState<'_>, text: &str) {
        let mut ctx = ParseContext::new("http://example.com/", "");
        rule.apply(&LineClassifier::scan_line(text), state, &mut ctx);
    }

    fn state() -> MediaState<'static> {
        MediaState::new("http://example.com/", 0, PlaylistLevelType::Main, 0, None)
    }

    #[test]
    fn test_numeric_prefix() {
        assert_eq!(numeric_prefix("10"), "10");
        assert_eq!(numeric_prefix(" 5"), "5");
        assert_eq!(numeric_prefix(".360"), ".360");
        assert_eq!(numeric_prefix("6.000000"), "6.000000");
        assert_eq!(numeric_prefix("4.5s"), "4.5");
        assert_eq!(numeric_prefix("7."), "7");
        assert_eq!(numeric_prefix("abc"), "");
    }

    #[test]
    fn test_extinf_duration_and_title() {
        let mut state = state();
        apply(&ExtInfRule, &mut state, "#EXTINF:5.97263,\t");
        assert_eq!(state.frag.duration, 5.97263);
        assert_eq!(state.frag.title.as_deref(), Some("\t"));
        assert_eq!(state.frag.tag_list, vec![vec!["INF", "5.97263", "\t"]]);

        let mut state = self::state();
        apply(&ExtInfRule, &mut state, "#EXTINF:.360,");
        assert_eq!(state.frag.duration, 0.36);
        assert_eq!(state.frag.title, None);
        assert_eq!(state.frag.tag_list, vec![vec!["INF", ".360"]]);

        let mut state = self::state();
        apply(&ExtInfRule, &mut state, "#EXTINF:6.000000");
        assert_eq!(state.frag.duration, 6.0);
        assert_eq!(state.frag.tag_list, vec![vec!["INF", "6.000000"]]);
    }

    #[test]
    fn test_bitrate_is_carried() {
        let mut state = state();
        apply(&SegmentFlagRule, &mut state, "#EXT-X-BITRATE:5083");
        assert_eq!(state.bitrate, Some(5_083_000));
        assert_eq!(state.frag.tag_list, vec![vec!["BITRATE", "5083"]]);

        apply(&SegmentFlagRule, &mut state, "#EXT-X-GAP");
        assert!(state.frag.gap);
    }

    #[test]
    fn test_bitrate_past_u64_limit_is_ignored() {
        let mut state = state();
        apply(&SegmentFlagRule, &mut state, "#EXT-X-BITRATE:100");
        apply(&SegmentFlagRule, &mut state, "#EXT-X-BITRATE:18446744073709552");
        assert_eq!(state.bitrate, Some(100_000));
    }

    #[test]
    fn test_custom_tags_split_at_first_colon() {
        let mut state = state();
        apply(&CustomTagRule, &mut state, "#EXT-X-CUSTOM-URI:http://dummy.url.com/hls/moreinfo.json");
        apply(&CustomTagRule, &mut state, "#EXT-X-CUE-IN");
        assert_eq!(
            state.frag.tag_list,
            vec![
                vec!["EXT-X-CUSTOM-URI", "http://dummy.url.com/hls/moreinfo.json"],
                vec!["EXT-X-CUE-IN"],
            ]
        );
    }

    #[test]
    fn test_byte_range_waits_for_uri() {
        let mut state = state();
        apply(&ByteRangeRule, &mut state, "#EXT-X-BYTERANGE:96256");
        assert_eq!(state.byte_range, Some(ByteRange::new(96256, None)));
        apply(&ByteRangeRule, &mut state, "#EXT-X-BYTERANGE:oops");
        assert_eq!(state.byte_range, Some(ByteRange::new(96256, None)));
    }

    #[test]
    fn test_discontinuity() {
        let mut state = state();
        apply(&DiscontinuityRule, &mut state, "#EXT-X-DISCONTINUITY");
        assert_eq!(state.cc, 1);
        assert_eq!(state.frag.tag_list, vec![vec!["DIS"]]);
    }

    #[test]
    fn test_discontinuity_at_u64_limit() {
        let mut state = state();
        state.cc = u64::MAX;
        apply(&DiscontinuityRule, &mut state, "#EXT-X-DISCONTINUITY");
        assert_eq!(state.cc, u64::MAX);
    }
}
