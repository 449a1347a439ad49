use super::{
    classifier::{Line, LineClassifier, LineType},
    context::ParseContext,
    rules::{RuleTable, map_date_ranges},
    state::MediaState,
};
use crate::{
    Error,
    hls::{LevelDetails, PlaylistLevelType, VariableList},
};

/// Line-by-line builder for media playlists.
///
/// Tags are dispatched through a [`RuleTable`]; URI lines close the pending
/// fragment.
pub struct MediaPlaylistParser<'p> {
    state: MediaState<'p>,
    context: ParseContext,
    rules: RuleTable,
}

impl<'p> MediaPlaylistParser<'p> {
    pub fn new(
        base_url: &str,
        text: &str,
        level: usize,
        level_type: PlaylistLevelType,
        start_sn: u64,
        parent_variables: Option<&'p VariableList>,
    ) -> Self {
        Self::with_rules(
            base_url,
            text,
            level,
            level_type,
            start_sn,
            parent_variables,
            RuleTable::default(),
        )
    }

    pub fn with_rules(
        base_url: &str,
        text: &str,
        level: usize,
        level_type: PlaylistLevelType,
        start_sn: u64,
        parent_variables: Option<&'p VariableList>,
        rules: RuleTable,
    ) -> Self {
        Self {
            state: MediaState::new(base_url, level, level_type, start_sn, parent_variables),
            context: ParseContext::new(base_url, text),
            rules,
        }
    }

    pub fn parse(mut self, text: &str) -> LevelDetails {
        let mut lines = LineClassifier::lines(text).filter(|l| l.kind != LineType::Empty);
        let first = lines.next();
        if first.is_none_or(|l| l.kind != LineType::ExtM3U) {
            self.context.report(Error::MissingFormatIdentifier);
        }

        for line in first.into_iter().chain(lines) {
            self.process_line(&line);
        }

        self.finish()
    }

    fn process_line(&mut self, line: &Line<'_>) {
        match line.kind {
            LineType::Uri => self.close_fragment(line.value.unwrap_or_default()),
            LineType::ExtM3U | LineType::Comment | LineType::Empty => {}
            kind => {
                if !self.state.first_occurrence(line, &mut self.context) {
                    return;
                }
                match self.rules.get(kind) {
                    Some(rule) => rule.apply(line, &mut self.state, &mut self.context),
                    None => tracing::debug!("Ignoring {} in media playlist", line.trimmed()),
                }
            }
        }
    }

    /// Close the pending fragment on its URI line.
    fn close_fragment(&mut self, uri: &str) {
        let relurl = self.context.substitute(uri);
        let url = self.context.resolve(&relurl);

        let state = &mut self.state;
        let byte_range = state.byte_range.take().and_then(|range| {
            let previous_end = state
                .previous_fragment()
                .filter(|prev| prev.relurl == relurl)
                .and_then(|prev| prev.byte_range)
                .map(|[_, end]| end);
            range.resolve(previous_end)
        });

        let mut frag = state.take_pending();
        frag.relurl = relurl;
        frag.url = url;
        frag.byte_range = byte_range;
        state.push_fragment(frag);
    }

    fn finish(mut self) -> LevelDetails {
        let state = &mut self.state;

        // Parts announced after the last segment describe the next one.
        if state.details.part_list.is_some() {
            let mut hint = state.take_pending();
            state.extrapolate_program_date_time(&mut hint);
            state.details.fragment_hint = Some(hint);
        }

        let skipped = state.details.skipped_segments as f64;
        state.total_duration += skipped * state.details.target_duration as f64;

        let details = &mut state.details;
        let listed = details.fragments.len();
        let live = details.live;
        if state.total_duration > 0.0
            && let Some(last) = details.fragments.last_mut().and_then(Option::as_mut)
        {
            details.average_target_duration = Some(state.total_duration / listed as f64);
            details.end_sn = last.sn;
            last.end_list = !live;
        }

        details.start_cc = state
            .start_cc
            .or_else(|| details.listed_fragments().next().map(|f| f.cc))
            .unwrap_or(0);
        if let Some(hint) = &details.fragment_hint {
            state.total_duration += hint.duration;
        }
        details.total_duration = state.total_duration;
        details.end_cc = state.cc;

        state.backfill_program_date_times();
        if !state.program_date_times.is_empty() && state.details.date_range_tag_count > 0 {
            map_date_ranges(&mut state.details, &state.program_date_times);
        }

        let details = &mut state.details;
        details.has_program_date_time = details
            .fragments
            .last()
            .and_then(Option::as_ref)
            .is_some_and(|f| f.program_date_time.is_some());
        details.variable_list = self.context.variables.take();
        details.has_variable_refs = self.context.has_variable_refs;
        details.playlist_parsing_error = self.context.take_error();

        std::mem::replace(details, LevelDetails::new(""))
    }
}

/// Parse a media playlist.
///
/// `parent_variables` are the variables of the multivariant playlist the
/// level came from, used by `EXT-X-DEFINE:IMPORT`.
pub fn parse_level_playlist(
    text: &str,
    base_url: &str,
    level: usize,
    level_type: PlaylistLevelType,
    start_sn: u64,
    parent_variables: Option<&VariableList>,
) -> LevelDetails {
    MediaPlaylistParser::new(base_url, text, level, level_type, start_sn, parent_variables)
        .parse(text)
}
