use super::{Line, LineType, MediaState, ParseContext, TagRule};
use crate::hls::{
    DateRange, LevelDetails,
    date_range::{epoch_millis, parse_date_time},
};

/// `EXT-X-PROGRAM-DATE-TIME`.
pub struct ProgramDateTimeRule;

impl TagRule for ProgramDateTimeRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXProgramDateTime]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, _context: &mut ParseContext) {
        let value = line.value.unwrap_or_default();
        state
            .frag
            .tag_list
            .push(vec!["PROGRAM-DATE-TIME".to_string(), value.to_string()]);

        match parse_date_time(value) {
            Ok(date) => {
                state.frag.raw_program_date_time = Some(value.to_string());
                state.frag.program_date_time = Some(epoch_millis(&date));
                if state.first_pdt_index.is_none() {
                    state.first_pdt_index = Some(state.details.fragments.len());
                }
            }
            Err(e) => tracing::warn!("Ignoring {}: {}", line.trimmed(), e),
        }
    }
}

/// `EXT-X-DATERANGE`. Tags sharing an ID merge into one record.
pub struct DateRangeRule;

impl TagRule for DateRangeRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXDateRange]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let value = line.value.unwrap_or_default();
        let attrs = context.attrs(value);
        let details = &mut state.details;

        let id = attrs.get("ID").unwrap_or_default().to_string();
        let range = DateRange::new(attrs, details.date_ranges.get(&id), details.date_range_tag_count);
        details.date_range_tag_count += 1;

        // Ranges in a delta update may refer to segments that were skipped.
        if range.is_valid || details.skipped_segments > 0 {
            details.date_ranges.insert(id, range);
        } else {
            tracing::warn!("Ignoring invalid DATERANGE tag: \"{}\"", value);
        }

        state
            .frag
            .tag_list
            .push(vec!["EXT-X-DATERANGE".to_string(), value.to_string()]);
    }
}

/// Anchor every date range to the fragment whose time span covers its
/// `START-DATE`, and place it on the playlist timeline.
///
/// `program_date_times` holds the indices of the fragments carrying an
/// explicit program date time.
pub fn map_date_ranges(details: &mut LevelDetails, program_date_times: &[usize]) {
    let fallback;
    let anchors = if program_date_times.is_empty() {
        let last = details.fragments.len().checked_sub(1);
        match last.filter(|&i| pdt_at(details, i).is_some()) {
            Some(last) => {
                fallback = [last];
                &fallback[..]
            }
            None => return,
        }
    } else {
        program_date_times
    };
    let Some(&last_anchor) = anchors.last() else {
        return;
    };
    let playlist_end = if details.live {
        f64::INFINITY
    } else {
        details.total_duration
    };

    let mut placements = Vec::with_capacity(details.date_ranges.len());
    for (id, range) in &details.date_ranges {
        let Some(start_date) = range.start_date else {
            continue;
        };
        let start = epoch_millis(&start_date);
        let index = (0..anchors.len())
            .rev()
            .find_map(|j| find_fragment_with_start_date(details, start, anchors, j, playlist_end))
            .unwrap_or(last_anchor);
        placements.push((id.clone(), index, start));
    }

    for (id, index, start) in placements {
        let Some(frag) = details.fragments.get(index).and_then(Option::as_ref) else {
            continue;
        };
        let Some(pdt) = frag.program_date_time else {
            continue;
        };
        let (sn, start_time) = (frag.sn, frag.start + (start - pdt) / 1000.0);
        if let Some(range) = details.date_ranges.get_mut(&id) {
            range.tag_anchor = Some(sn);
            range.start_time = Some(start_time);
        }
    }
}

fn pdt_at(details: &LevelDetails, index: usize) -> Option<f64> {
    details
        .fragments
        .get(index)?
        .as_ref()?
        .program_date_time
}

/// Index of the fragment following anchor `j` that contains `start`, or the
/// anchor itself when `start` falls in its span but no later fragment
/// contains it.
fn find_fragment_with_start_date(
    details: &LevelDetails,
    start: f64,
    anchors: &[usize],
    j: usize,
    playlist_end: f64,
) -> Option<usize> {
    let index = anchors[j];
    let anchor = details.fragments.get(index)?.as_ref()?;
    let pdt_start = anchor.program_date_time?;
    if start < pdt_start && j != 0 {
        return None;
    }

    let next = anchors.get(j + 1).copied();
    let next_start = next
        .and_then(|n| details.fragments.get(n)?.as_ref())
        .map(|f| f.start)
        .filter(|&s| s > 0.0)
        .unwrap_or(playlist_end);
    let span = next_start - anchor.start;
    if start > pdt_start + span * 1000.0 {
        return None;
    }

    let fragments = &details.fragments;
    if fragments.len() > anchors.len() {
        let end = next.unwrap_or(fragments.len() - 1);
        for i in (index + 1..=end).rev() {
            let Some(frag) = fragments.get(i).and_then(Option::as_ref) else {
                continue;
            };
            if let Some(pdt) = frag.program_date_time
                && start >= pdt
                && start < pdt + frag.duration * 1000.0
            {
                return Some(i);
            }
        }
    }
    Some(index)
}
