use std::collections::BTreeMap;

use serde::Serialize;

use super::{attr_list::AttrList, key::LevelKey, level::Level, variables::VariableList};
use crate::Error;

/// `EXT-X-CONTENT-STEERING` server and initial pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSteering {
    pub uri: String,
    pub pathway_id: String,
}

/// Result of parsing a multivariant (master) playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterPlaylist {
    pub levels: Vec<Level>,
    /// `EXT-X-SESSION-DATA` by DATA-ID; a repeated DATA-ID overwrites.
    pub session_data: Option<BTreeMap<String, AttrList>>,
    pub session_keys: Option<Vec<LevelKey>>,
    pub content_steering: Option<ContentSteering>,
    pub start_time_offset: Option<f64>,
    pub variable_list: Option<VariableList>,
    pub has_variable_refs: bool,
    pub playlist_parsing_error: Option<Error>,
}
