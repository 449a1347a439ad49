pub mod attr_list;
pub mod byterange;
pub mod codecs;
pub mod date_range;
pub mod details;
pub mod fragment;
pub mod key;
pub mod level;
pub mod multivariant;
pub mod rendition;
pub mod variables;

pub use attr_list::{AttrList, Resolution};
pub use byterange::ByteRange;
pub use codecs::{CodecSet, CodecType};
pub use date_range::{DateRange, DateRangeCue};
pub use details::{LevelDetails, PlaylistType};
pub use fragment::{Fragment, InitSegment, LevelKeys, LoadStats, Part, PlaylistLevelType};
pub use key::{KeyMethod, LevelKey};
pub use level::Level;
pub use multivariant::{ContentSteering, MasterPlaylist};
pub use rendition::{MediaGroups, MediaType, Rendition};
pub use variables::VariableList;
