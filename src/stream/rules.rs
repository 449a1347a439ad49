pub mod date_range;
pub mod key;
pub mod low_latency;
pub mod map;
pub mod playlist;
pub mod segment;

use std::collections::HashMap;

use super::{
    classifier::{Line, LineType},
    context::ParseContext,
    state::MediaState,
};

pub use date_range::{DateRangeRule, ProgramDateTimeRule, map_date_ranges};
pub use key::KeyRule;
pub use low_latency::{
    PartInfRule, PartRule, PreloadHintRule, RenditionReportRule, ServerControlRule, SkipRule,
};
pub use map::MapRule;
pub use playlist::{DefineRule, EndListRule, PlaylistHeaderRule, SequenceRule, StartRule};
pub use segment::{ByteRangeRule, CustomTagRule, DiscontinuityRule, ExtInfRule, SegmentFlagRule};

/// Handler for one or more media playlist tags.
pub trait TagRule: Send + Sync {
    /// Tags dispatched to this rule.
    fn tags(&self) -> &'static [LineType];

    /// Apply the tag on `line` to the scan state.
    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext);
}

/// Lookup table from tag to rule.
pub struct RuleTable {
    rules: Vec<Box<dyn TagRule>>,
    by_tag: HashMap<LineType, usize>,
}

impl RuleTable {
    /// Build the table. When two rules claim a tag, the later one wins.
    pub fn new(rules: Vec<Box<dyn TagRule>>) -> Self {
        let mut by_tag = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            for tag in rule.tags() {
                by_tag.insert(*tag, index);
            }
        }
        Self { rules, by_tag }
    }

    pub fn get(&self, tag: LineType) -> Option<&dyn TagRule> {
        self.by_tag.get(&tag).map(|&index| self.rules[index].as_ref())
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Create the default set of media playlist rules.
pub fn default_rules() -> Vec<Box<dyn TagRule>> {
    vec![
        Box::new(PlaylistHeaderRule),
        Box::new(SequenceRule),
        Box::new(EndListRule),
        Box::new(StartRule),
        Box::new(DefineRule),
        Box::new(ExtInfRule),
        Box::new(ByteRangeRule),
        Box::new(DiscontinuityRule),
        Box::new(SegmentFlagRule),
        Box::new(CustomTagRule),
        Box::new(KeyRule),
        Box::new(MapRule),
        Box::new(ProgramDateTimeRule),
        Box::new(DateRangeRule),
        Box::new(PartInfRule),
        Box::new(PartRule),
        Box::new(PreloadHintRule),
        Box::new(ServerControlRule),
        Box::new(RenditionReportRule),
        Box::new(SkipRule),
    ]
}
