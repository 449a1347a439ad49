use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;

use super::key::{IDENTITY_KEY_FORMAT, LevelKey};

/// Active keys by KEYFORMAT. Shared by every fragment the set applies to.
pub type LevelKeys = Arc<BTreeMap<String, LevelKey>>;

/// Which kind of rendition a media playlist belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistLevelType {
    #[default]
    Main,
    Audio,
    Subtitle,
}

impl PlaylistLevelType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "main" => Some(Self::Main),
            "audio" => Some(Self::Audio),
            "subtitle" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

/// Transfer statistics reported for a loaded fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Total bytes received.
    pub total: u64,
}

/// Media initialization section declared by `EXT-X-MAP`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSegment {
    pub relurl: String,
    pub url: String,
    pub byte_range: Option<[u64; 2]>,
    pub level: usize,
    pub cc: u64,
    pub levelkeys: Option<LevelKeys>,
}

impl InitSegment {
    /// Identity used in place of a sequence number.
    pub const SN: &'static str = "initSegment";

    pub fn sn(&self) -> &'static str {
        Self::SN
    }

    pub fn decrypt_data(&self) -> Option<LevelKey> {
        select_decrypt_data(self.levelkeys.as_ref(), None)
    }
}

/// One media segment of a media playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub sn: u64,
    pub cc: u64,
    pub level: usize,
    #[serde(rename = "type")]
    pub level_type: PlaylistLevelType,
    pub duration: f64,
    pub start: f64,
    pub title: Option<String>,
    pub relurl: String,
    pub url: String,
    pub byte_range: Option<[u64; 2]>,
    pub init_segment: Option<Arc<InitSegment>>,
    pub levelkeys: Option<LevelKeys>,
    /// Absolute time in milliseconds since the Unix epoch.
    pub program_date_time: Option<f64>,
    pub raw_program_date_time: Option<String>,
    pub gap: bool,
    pub tag_list: Vec<Vec<String>>,
    pub end_list: bool,
    /// Carried `EXT-X-BITRATE` value in bits per second.
    #[serde(skip)]
    pub(crate) nominal_bitrate: Option<u64>,
    #[serde(skip)]
    stats: Option<LoadStats>,
}

impl Fragment {
    pub fn new(level_type: PlaylistLevelType, level: usize) -> Self {
        Self {
            sn: 0,
            cc: 0,
            level,
            level_type,
            duration: 0.0,
            start: 0.0,
            title: None,
            relurl: String::new(),
            url: String::new(),
            byte_range: None,
            init_segment: None,
            levelkeys: None,
            program_date_time: None,
            raw_program_date_time: None,
            gap: false,
            tag_list: Vec::new(),
            end_list: false,
            nominal_bitrate: None,
            stats: None,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn end_program_date_time(&self) -> Option<f64> {
        self.program_date_time.map(|pdt| pdt + self.duration * 1000.0)
    }

    pub fn set_stats(&mut self, stats: LoadStats) {
        self.stats = Some(stats);
    }

    pub fn stats(&self) -> Option<&LoadStats> {
        self.stats.as_ref()
    }

    /// Bytes transferred when known, otherwise the byte-range length.
    pub fn byte_length(&self) -> Option<u64> {
        if let Some(stats) = self.stats.filter(|s| s.total > 0) {
            return Some(stats.total);
        }
        self.byte_range.map(|[start, end]| end - start)
    }

    /// Bits per second, from the byte length when known, else the carried
    /// `EXT-X-BITRATE` value.
    pub fn bitrate(&self) -> Option<f64> {
        match self.byte_length() {
            Some(bytes) if bytes > 0 && self.duration > 0.0 => {
                Some(bytes as f64 * 8.0 / self.duration)
            }
            _ => self.nominal_bitrate.map(|b| b as f64),
        }
    }

    /// Decryption parameters for this fragment: the identity key, or the only
    /// key when a single key system is active.
    pub fn decrypt_data(&self) -> Option<LevelKey> {
        select_decrypt_data(self.levelkeys.as_ref(), Some(self.sn))
    }
}

fn select_decrypt_data(levelkeys: Option<&LevelKeys>, sn: Option<u64>) -> Option<LevelKey> {
    let keys = levelkeys?;
    match keys.get(IDENTITY_KEY_FORMAT) {
        Some(key) => key.decrypt_data(sn),
        None if keys.len() == 1 => keys.values().next()?.decrypt_data(sn),
        None => None,
    }
}

/// A low-latency partial segment (`EXT-X-PART`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub duration: f64,
    pub gap: bool,
    pub independent: bool,
    /// Position within the owning fragment.
    pub index: usize,
    pub relurl: String,
    pub url: String,
    pub byte_range: Option<[u64; 2]>,
    /// Sequence number of the owning fragment.
    pub fragment_sn: u64,
    /// Offset from the start of the owning fragment.
    pub frag_offset: f64,
    pub start: f64,
}

impl Part {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}
