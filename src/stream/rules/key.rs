use std::sync::Arc;

use super::{Line, LineType, MediaState, ParseContext, TagRule};

/// `EXT-X-KEY`. Keys with distinct KEYFORMATs accumulate into one set;
/// `METHOD=NONE` clears it.
pub struct KeyRule;

impl TagRule for KeyRule {
    fn tags(&self) -> &'static [LineType] {
        &[LineType::ExtXKey]
    }

    fn apply(&self, line: &Line<'_>, state: &mut MediaState<'_>, context: &mut ParseContext) {
        let value = line.value.unwrap_or_default();
        let key = context.parse_key(value);
        if !key.is_supported() {
            tracing::warn!("[Keys] Ignoring invalid EXT-X-KEY tag: \"{}\"", value);
            return;
        }
        if !key.encrypted() {
            state.levelkeys = None;
            return;
        }

        // Fragments already closed keep the set they were given.
        let mut keys = state.levelkeys.as_deref().cloned().unwrap_or_default();
        keys.insert(key.key_format.clone(), key);
        state.levelkeys = Some(Arc::new(keys));
    }
}
