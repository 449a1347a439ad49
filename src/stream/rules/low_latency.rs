use super::{Line, LineType, MediaState, ParseContext, TagRule};
use crate::hls::{ByteRange, Part};

/// `EXT-X-PART-INF`.
pub struct PartInfRule;

impl TagRule for PartInfRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXPartInf]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        state.details.part_target = attrs.decimal_floating_point("PART-TARGET").unwrap_or(0.0);
    }
}

/// `EXT-X-PART`: a partial segment of the pending fragment.
pub struct PartRule;

impl TagRule for PartRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXPart]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        let index = state.current_part;
        state.current_part += 1;

        let part_list = state.details.part_list.get_or_insert_with(Vec::new);
        let previous = part_list.last().filter(|_| index > 0);
        let frag_offset = previous.map_or(0.0, |p| p.frag_offset + p.duration);
        let previous_end = previous.and_then(|p| p.byte_range).map(|[_, end]| end);

        let byte_range = attrs.get("BYTERANGE").and_then(|value| match ByteRange::parse(value) {
            Ok(range) => range.resolve(previous_end),
            Err(e) => {
                tracing::warn!("Ignoring EXT-X-PART BYTERANGE: {}", e);
                None
            }
        });

        let relurl = attrs.get("URI").unwrap_or_default().to_string();
        let duration = attrs.decimal_floating_point("DURATION").unwrap_or(0.0);
        let part = Part {
            duration,
            gap: attrs.bool("GAP"),
            independent: attrs.bool("INDEPENDENT"),
            index,
            url: context.resolve(&relurl),
            relurl,
            byte_range,
            fragment_sn: state.current_sn,
            frag_offset,
            start: state.frag.start + frag_offset,
        };
        part_list.push(part);
        state.frag.duration += duration;
    }
}

/// `EXT-X-PRELOAD-HINT`, kept as attributes.
pub struct PreloadHintRule;

impl TagRule for PreloadHintRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXPreloadHint]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        state.details.preload_hint = Some(context.attrs(line.value.unwrap_or_default()));
    }
}

/// `EXT-X-RENDITION-REPORT`, kept as attributes.
pub struct RenditionReportRule;

impl TagRule for RenditionReportRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXRenditionReport]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        state
            .details
            .rendition_reports
            .get_or_insert_with(Vec::new)
            .push(attrs);
    }
}

/// `EXT-X-SERVER-CONTROL`.
pub struct ServerControlRule;

impl TagRule for ServerControlRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXServerControl]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        let details = &mut state.details;
        details.can_block_reload = attrs.bool("CAN-BLOCK-RELOAD");
        details.can_skip_until = attrs.optional_float("CAN-SKIP-UNTIL", 0.0);
        details.can_skip_date_ranges =
            details.can_skip_until > 0.0 && attrs.bool("CAN-SKIP-DATERANGES");
        details.part_hold_back = attrs.optional_float("PART-HOLD-BACK", 0.0);
        details.hold_back = attrs.optional_float("HOLD-BACK", 0.0);
    }
}

/// Upper bound on `SKIPPED-SEGMENTS` in a single delta update.
pub const MAX_SKIPPED_SEGMENTS: u64 = 1 << 20;

/// `EXT-X-SKIP`: segments left out of a delta update become `None`
/// placeholders.
pub struct SkipRule;

impl TagRule for SkipRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXSkip]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        if let Some(skipped) = attrs.decimal_integer("SKIPPED-SEGMENTS") {
            match state.current_sn.checked_add(skipped) {
                Some(next_sn) if skipped <= MAX_SKIPPED_SEGMENTS => {
                    state.details.skipped_segments = state.details.skipped_segments.saturating_add(skipped);
                    let count = usize::try_from(skipped).unwrap_or_default();
                    state.details.fragments.extend(std::iter::repeat_n(None, count));
                    state.current_sn = next_sn;
                }
                _ => tracing::warn!("Ignoring {}: too many skipped segments", line.trimmed()),
            }
        }
        if let Some(removed) = attrs.enumerated_string("RECENTLY-REMOVED-DATERANGES") {
            state.details.recently_removed_dateranges =
                Some(removed.split('\t').map(str::to_string).collect());
        }
    }
}
