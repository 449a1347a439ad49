use std::collections::BTreeMap;

use serde::Serialize;

use super::{
    attr_list::AttrList,
    date_range::DateRange,
    fragment::{Fragment, Part},
    variables::VariableList,
};
use crate::Error;

/// `EXT-X-PLAYLIST-TYPE` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistType {
    Vod,
    Event,
    Unknown(String),
}

impl PlaylistType {
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "VOD" => Self::Vod,
            "EVENT" => Self::Event,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Vod => "VOD",
            Self::Event => "EVENT",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

impl Serialize for PlaylistType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of parsing a media playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDetails {
    /// URL the playlist was loaded from.
    pub url: String,
    /// Segments in order. `None` marks a segment skipped by a delta update.
    pub fragments: Vec<Option<Fragment>>,
    /// Parts announced after the last complete segment.
    pub fragment_hint: Option<Fragment>,
    pub part_list: Option<Vec<Part>>,
    pub encrypted_fragments: Vec<Fragment>,
    pub date_ranges: BTreeMap<String, DateRange>,
    pub date_range_tag_count: usize,
    pub total_duration: f64,
    pub average_target_duration: Option<f64>,
    pub target_duration: u64,
    pub start_sn: u64,
    pub end_sn: u64,
    pub start_cc: u64,
    pub end_cc: u64,
    pub version: Option<u64>,
    #[serde(rename = "type")]
    pub playlist_type: Option<PlaylistType>,
    pub live: bool,
    pub can_block_reload: bool,
    pub can_skip_until: f64,
    pub can_skip_date_ranges: bool,
    pub part_hold_back: f64,
    pub hold_back: f64,
    pub part_target: f64,
    pub preload_hint: Option<AttrList>,
    pub rendition_reports: Option<Vec<AttrList>>,
    pub skipped_segments: u64,
    pub recently_removed_dateranges: Option<Vec<String>>,
    pub has_program_date_time: bool,
    pub start_time_offset: Option<f64>,
    pub variable_list: Option<VariableList>,
    pub has_variable_refs: bool,
    pub playlist_parsing_error: Option<Error>,
}

impl LevelDetails {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fragments: Vec::new(),
            fragment_hint: None,
            part_list: None,
            encrypted_fragments: Vec::new(),
            date_ranges: BTreeMap::new(),
            date_range_tag_count: 0,
            total_duration: 0.0,
            average_target_duration: None,
            target_duration: 0,
            start_sn: 0,
            end_sn: 0,
            start_cc: 0,
            end_cc: 0,
            version: None,
            playlist_type: None,
            live: true,
            can_block_reload: false,
            can_skip_until: 0.0,
            can_skip_date_ranges: false,
            part_hold_back: 0.0,
            hold_back: 0.0,
            part_target: 0.0,
            preload_hint: None,
            rendition_reports: None,
            skipped_segments: 0,
            recently_removed_dateranges: None,
            has_program_date_time: false,
            start_time_offset: None,
            variable_list: None,
            has_variable_refs: false,
            playlist_parsing_error: None,
        }
    }

    /// Fragments that were actually listed, skipping delta placeholders.
    pub fn listed_fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().flatten()
    }

    /// Fragment with sequence number `sn`, if it was listed.
    pub fn fragment_by_sn(&self, sn: u64) -> Option<&Fragment> {
        let index = sn.checked_sub(self.start_sn)?;
        self.fragments.get(usize::try_from(index).ok()?)?.as_ref()
    }

    /// Parts belonging to the fragment numbered `sn`.
    pub fn parts_of(&self, sn: u64) -> impl Iterator<Item = &Part> {
        self.part_list
            .iter()
            .flatten()
            .filter(move |part| part.fragment_sn == sn)
    }
}
