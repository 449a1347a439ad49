use std::sync::Arc;

use super::{Line, LineType, MediaState, ParseContext, TagRule};
use crate::hls::{ByteRange, InitSegment};

/// `EXT-X-MAP`: sets the init segment of the pending and all following
/// fragments.
pub struct MapRule;

impl TagRule for MapRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXMap]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let attrs = context.attrs(line.value.unwrap_or_default());
        let relurl = attrs.get("URI").unwrap_or_default().to_string();
        let url = if relurl.is_empty() {
            String::new()
        } else {
            context.resolve(&relurl)
        };

        // The BYTERANGE attribute never continues a previous range.
        let byte_range = attrs.get("BYTERANGE").and_then(|value| match ByteRange::parse(value) {
            Ok(range) => range.resolve(None),
            Err(e) => {
                tracing::warn!("Ignoring EXT-X-MAP BYTERANGE: {}", e);
                None
            }
        });

        state.init_segment = Some(Arc::new(InitSegment {
            relurl,
            url,
            byte_range,
            level: state.level,
            cc: state.cc,
            levelkeys: state.levelkeys.clone(),
        }));
    }
}
