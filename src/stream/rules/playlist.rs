use super::{Line, LineType, MediaState, ParseContext, TagRule};
use crate::hls::{PlaylistType, attr_list::leading_float};

/// `EXT-X-TARGETDURATION`, `EXT-X-VERSION` and `EXT-X-PLAYLIST-TYPE`.
pub struct PlaylistHeaderRule;

impl TagRule for PlaylistHeaderRule {
    fn tags(&self) -> &'static [LineType] {
        &[
            LineType::ExtXTargetDuration,
            LineType::ExtXVersion,
            LineType::ExtXPlaylistType,
        ]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        let value = line.value.unwrap_or_default();
        let details = &mut state.details;
        match line.kind {
            LineType::ExtXTargetDuration => match leading_float(value) {
                Some(duration) => details.target_duration = duration.floor().max(1.0) as u64,
                None => tracing::warn!("Ignoring invalid {}", line.trimmed()),
            },
            LineType::ExtXVersion => details.version = value.trim().parse().ok(),
            _ => details.playlist_type = Some(PlaylistType::parse(value.trim())),
        }
    }
}

/// `EXT-X-MEDIA-SEQUENCE` and `EXT-X-DISCONTINUITY-SEQUENCE`, which are only
/// honoured before the first segment.
pub struct SequenceRule;

impl TagRule for SequenceRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXMediaSequence, LineType::ExtXDiscontinuitySequence]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        if !state.before_first_segment(line, context) {
            return;
        }
        let Ok(number) = line.value.unwrap_or_default().trim().parse::<u64>() else {
            tracing::warn!("Ignoring invalid {}", line.trimmed());
            return;
        };

        if line.kind == LineType::ExtXMediaSequence {
            state.details.start_sn = number;
            state.current_sn = number;
        } else {
            state.cc = number;
            state.start_cc = Some(number);
        }
    }
}

/// `EXT-X-ENDLIST`.
pub struct EndListRule;

impl TagRule for EndListRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXEndList]
    }

    fn apply(&self, _line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        state.details.live = false;
    }
}

/// `EXT-X-START`.
pub struct StartRule;

impl TagRule for StartRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXStart]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        state.details.start_time_offset = attrs.decimal_floating_point("TIME-OFFSET");
    }
}

/// `EXT-X-DEFINE`, with `IMPORT` served from the multivariant variables.
pub struct DefineRule;

impl TagRule for DefineRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXDefine]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        context.define(&attrs, state.parent_variables);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::{Fragment, PlaylistLevelType, VariableList};
    use crate::stream::classifier::LineClassifier;

    fn state() -> MediaState<'static> {
        MediaState::new("http://example.com/", 0, PlaylistLevelType::Main, 0, None)
    }

    fn apply(rule: &dyn TagRule, state: &mut MediaState<'_>, ctx: &mut ParseContext, text: &str) {
        rule.apply(&LineClassifier::scan_line(text), state, ctx);
    }

    #[test]
    fn test_target_duration_is_floored_with_minimum() {
        let mut ctx = ParseContext::new("", "");
        let mut state = state();
        apply(&PlaylistHeaderRule, &mut state, &mut ctx, "#EXT-X-TARGETDURATION:2.5");
        assert_eq!(state.details.target_duration, 2);
        apply(&PlaylistHeaderRule, &mut state, &mut ctx, "#EXT-X-TARGETDURATION:0.5");
        assert_eq!(state.details.target_duration, 1);
    }

    #[test]
    fn test_header_values() {
        let mut ctx = ParseContext::new("", "");
        let mut state = state();
        apply(&PlaylistHeaderRule, &mut state, &mut ctx, "#EXT-X-VERSION:7");
        apply(&PlaylistHeaderRule, &mut state, &mut ctx, "#EXT-X-PLAYLIST-TYPE:VOD");
        apply(&EndListRule, &mut state, &mut ctx, "#EXT-X-ENDLIST");
        apply(&StartRule, &mut state, &mut ctx, "#EXT-X-START:TIME-OFFSET=10.3");
        assert_eq!(state.details.version, Some(7));
        assert_eq!(state.details.playlist_type, Some(PlaylistType::Vod));
        assert!(!state.details.live);
        assert_eq!(state.details.start_time_offset, Some(10.3));
    }

    #[test]
    fn test_sequence_before_first_segment() {
        let mut ctx = ParseContext::new("", "");
        let mut state = state();
        apply(&SequenceRule, &mut state, &mut ctx, "#EXT-X-MEDIA-SEQUENCE:7478");
        apply(&SequenceRule, &mut state, &mut ctx, "#EXT-X-DISCONTINUITY-SEQUENCE:20");
        assert_eq!(state.details.start_sn, 7478);
        assert_eq!(state.current_sn, 7478);
        assert_eq!(state.cc, 20);
        assert!(ctx.error().is_none());

        state.details.fragments.push(Some(Fragment::new(PlaylistLevelType::Main, 0)));
        apply(&SequenceRule, &mut state, &mut ctx, "#EXT-X-MEDIA-SEQUENCE:2");
        assert_eq!(state.details.start_sn, 7478);
        assert_eq!(
            ctx.error().map(ToString::to_string),
            Some("#EXT-X-MEDIA-SEQUENCE must appear before the first Media Segment (#EXT-X-MEDIA-SEQUENCE:2)".into())
        );
    }

    #[test]
    fn test_define_import() {
        let parent: VariableList = [("mvpVariable".to_string(), "ok".to_string())].into_iter().collect();
        let mut ctx = ParseContext::new("http://example.com/", "");
        let mut state = MediaState::new("", 0, PlaylistLevelType::Main, 0, Some(&parent));
        apply(&DefineRule, &mut state, &mut ctx, r#"#EXT-X-DEFINE:IMPORT="mvpVariable""#);
        assert!(ctx.error().is_none());
        assert_eq!(ctx.variables.as_ref().and_then(|v| v.get("mvpVariable")), Some("ok"));
    }
}
