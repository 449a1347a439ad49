use std::{collections::HashSet, sync::Arc};

use super::{
    classifier::{Line, LineType},
    context::ParseContext,
};
use crate::{
    Error,
    hls::{
        ByteRange, Fragment, InitSegment, LevelDetails, LevelKey, LevelKeys, PlaylistLevelType,
        VariableList,
    },
};

/// Tags that may appear at most once in a media playlist.
const SINGLE_OCCURRENCE: &[LineType] = &[
    LineType::ExtXTargetDuration,
    LineType::ExtXVersion,
    LineType::ExtXMediaSequence,
    LineType::ExtXDiscontinuitySequence,
    LineType::ExtXPlaylistType,
    LineType::ExtXPartInf,
    LineType::ExtXServerControl,
    LineType::ExtXSkip,
    LineType::ExtXEndList,
];

/// State carried across the lines of a media playlist.
pub struct MediaState<'p> {
    /// Result under construction.
    pub details: LevelDetails,

    pub level: usize,
    pub level_type: PlaylistLevelType,

    /// Variables of the multivariant playlist, for `IMPORT`.
    pub parent_variables: Option<&'p VariableList>,

    /// Fragment collecting the tags seen since the last URI.
    pub frag: Fragment,

    /// Sequence number the pending fragment will get.
    pub current_sn: u64,

    /// Index of the next part of the pending fragment.
    pub current_part: usize,

    /// Continuity counter.
    pub cc: u64,

    /// Value of `EXT-X-DISCONTINUITY-SEQUENCE`, once applied.
    pub start_cc: Option<u64>,

    /// Sum of the durations of the listed fragments.
    pub total_duration: f64,

    pub init_segment: Option<Arc<InitSegment>>,
    pub levelkeys: Option<LevelKeys>,

    /// Carried `EXT-X-BITRATE`, bits per second.
    pub bitrate: Option<u64>,

    /// `EXT-X-BYTERANGE` waiting for the URI it applies to.
    pub byte_range: Option<ByteRange>,

    /// Indices of the fragments with an explicit program date time.
    pub program_date_times: Vec<usize>,

    /// Index of the first fragment with an explicit program date time.
    pub first_pdt_index: Option<usize>,

    seen: HashSet<LineType>,
}

impl<'p> MediaState<'p> {
    pub fn new(
        base_url: &str,
        level: usize,
        level_type: PlaylistLevelType,
        start_sn: u64,
        parent_variables: Option<&'p VariableList>,
    ) -> Self {
        let mut details = LevelDetails::new(base_url);
        details.start_sn = start_sn;

        Self {
            details,
            level,
            level_type,
            parent_variables,
            frag: Fragment::new(level_type, level),
            current_sn: start_sn,
            current_part: 0,
            cc: 0,
            start_cc: None,
            total_duration: 0.0,
            init_segment: None,
            levelkeys: None,
            bitrate: None,
            byte_range: None,
            program_date_times: Vec::new(),
            first_pdt_index: None,
            seen: HashSet::new(),
        }
    }

    /// Record an occurrence of `line`'s tag. Returns `false`, after reporting
    /// the violation, for a repeat of a tag allowed only once.
    pub fn first_occurrence(&mut self, line: &Line<'_>, context: &mut ParseContext) -> bool {
        if !SINGLE_OCCURRENCE.contains(&line.kind) || self.seen.insert(line.kind) {
            return true;
        }
        context.report(Error::MultipleTagOccurrence {
            tag: tag_suffix(line.name).to_string(),
            line: line.trimmed().to_string(),
        });
        false
    }

    /// Whether any segment, listed or skipped, precedes the current line.
    pub fn has_fragments(&self) -> bool {
        !self.details.fragments.is_empty()
    }

    /// Returns `false`, after reporting the violation, when `line` comes
    /// after the first media segment.
    pub fn before_first_segment(&self, line: &Line<'_>, context: &mut ParseContext) -> bool {
        if !self.has_fragments() {
            return true;
        }
        context.report(Error::TagAfterFirstSegment {
            tag: tag_suffix(line.name).to_string(),
            line: line.trimmed().to_string(),
        });
        false
    }

    pub fn previous_fragment(&self) -> Option<&Fragment> {
        self.details.fragments.last().and_then(Option::as_ref)
    }

    /// Detach the pending fragment, stamped with the carried state.
    pub fn take_pending(&mut self) -> Fragment {
        let mut frag = std::mem::replace(&mut self.frag, Fragment::new(self.level_type, self.level));
        frag.sn = self.current_sn;
        frag.cc = self.cc;
        frag.init_segment = self.init_segment.clone();
        frag.levelkeys = self.levelkeys.clone();
        frag.nominal_bitrate = self.bitrate;
        frag
    }

    /// Append a closed fragment and open the next one.
    pub fn push_fragment(&mut self, mut frag: Fragment) {
        let index = self.details.fragments.len();
        if frag.program_date_time.is_some() {
            self.program_date_times.push(index);
        } else {
            self.extrapolate_program_date_time(&mut frag);
        }
        self.track_encryption(&frag);

        self.total_duration += frag.duration;
        self.current_sn = self.current_sn.saturating_add(1);
        self.current_part = 0;
        self.details.fragments.push(Some(frag));

        self.frag.start = self.total_duration;
    }

    /// Continue the previous fragment's program date time.
    pub fn extrapolate_program_date_time(&self, frag: &mut Fragment) {
        if frag.program_date_time.is_none() {
            frag.program_date_time = self
                .previous_fragment()
                .and_then(Fragment::end_program_date_time);
        }
    }

    /// Remember the first fragment of each new key set using common encryption.
    fn track_encryption(&mut self, frag: &Fragment) {
        let Some(keys) = &frag.levelkeys else {
            return;
        };
        let new_set = self
            .details
            .encrypted_fragments
            .last()
            .and_then(|last| last.levelkeys.as_ref())
            .is_none_or(|last| !Arc::ptr_eq(last, keys));
        if new_set && keys.values().any(LevelKey::is_common_encryption) {
            self.details.encrypted_fragments.push(frag.clone());
        }
    }

    /// Fill in program date times before the first explicit one by walking
    /// backwards from it.
    pub fn backfill_program_date_times(&mut self) {
        let Some(first) = self.first_pdt_index.filter(|&i| i > 0) else {
            return;
        };
        let fragments = &mut self.details.fragments;
        let Some(mut next_pdt) = fragments
            .get(first)
            .and_then(Option::as_ref)
            .and_then(|f| f.program_date_time)
        else {
            return;
        };

        for slot in fragments[..first].iter_mut().rev() {
            let Some(frag) = slot else {
                break;
            };
            next_pdt -= frag.duration * 1000.0;
            frag.program_date_time = Some(next_pdt);
        }

        if fragments.first().is_some_and(Option::is_some) {
            self.program_date_times.insert(0, 0);
        }
    }
}

/// Tag name as used in occurrence messages: `X-TARGETDURATION` for
/// `EXT-X-TARGETDURATION`.
fn tag_suffix(name: &str) -> &str {
    name.strip_prefix("EXT-").unwrap_or(name)
}
