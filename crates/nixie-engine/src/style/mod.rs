//! Captured presentation state.
//!
//! The engine takes over the surface's background while it runs and has to
//! hand the original presentation back on destroy. This cache remembers
//! whatever was in place before the takeover, plus derived values (like the
//! intrinsic background image size) that are expensive to recompute.

use std::collections::BTreeMap;

/// Keys for the cached presentation properties.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum StyleKey {
    /// Stacking order the surface had before the takeover.
    StackOrder,
    /// Positioning mode the surface had before the takeover.
    Position,
    /// Background declaration set directly on the surface.
    InlineBackground,
    /// Background declaration resolved from inherited styles.
    ComputedBackground,
    /// Intrinsic width of the decoded background image, in pixels.
    BackgroundWidth,
    /// Intrinsic height of the decoded background image, in pixels.
    BackgroundHeight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Text(String),
    Number(f32),
}

/// Typed key/value store for captured and derived style state.
#[derive(Debug, Default)]
pub struct StyleCache {
    entries: BTreeMap<StyleKey, StyleValue>,
}

impl StyleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StyleKey) -> Option<&StyleValue> {
        self.entries.get(&key)
    }

    pub fn get_number(&self, key: StyleKey) -> Option<f32> {
        match self.entries.get(&key)? {
            StyleValue::Number(n) => Some(*n),
            StyleValue::Text(_) => None,
        }
    }

    pub fn set(&mut self, key: StyleKey, value: StyleValue) {
        self.entries.insert(key, value);
    }

    pub fn set_number(&mut self, key: StyleKey, value: f32) {
        self.set(key, StyleValue::Number(value));
    }

    /// Stores `value` only if the key was never captured, so the earliest
    /// observation (the pre-takeover state) wins.
    pub fn capture(&mut self, key: StyleKey, value: StyleValue) {
        self.entries.entry(key).or_insert(value);
    }

    /// Removes and returns a cached value, typically during teardown.
    pub fn evict(&mut self, key: StyleKey) -> Option<StyleValue> {
        self.entries.remove(&key)
    }

    /// Hands every captured value back to the caller and clears the cache.
    /// Used on destroy to restore the pre-takeover presentation.
    pub fn restore_into<F>(&mut self, mut apply: F)
    where
        F: FnMut(StyleKey, StyleValue),
    {
        while let Some((key, value)) = self.entries.pop_first() {
            apply(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_keeps_the_first_observation() {
        let mut cache = StyleCache::new();
        cache.capture(StyleKey::Position, StyleValue::Text("static".into()));
        cache.capture(StyleKey::Position, StyleValue::Text("relative".into()));
        assert_eq!(
            cache.get(StyleKey::Position),
            Some(&StyleValue::Text("static".into()))
        );
    }

    #[test]
    fn set_overwrites() {
        let mut cache = StyleCache::new();
        cache.set_number(StyleKey::BackgroundWidth, 512.0);
        cache.set_number(StyleKey::BackgroundWidth, 1024.0);
        assert_eq!(cache.get_number(StyleKey::BackgroundWidth), Some(1024.0));
    }

    #[test]
    fn evict_removes_the_entry() {
        let mut cache = StyleCache::new();
        cache.set_number(StyleKey::BackgroundHeight, 256.0);
        assert_eq!(
            cache.evict(StyleKey::BackgroundHeight),
            Some(StyleValue::Number(256.0))
        );
        assert!(cache.get(StyleKey::BackgroundHeight).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn restore_drains_everything_in_key_order() {
        let mut cache = StyleCache::new();
        cache.capture(StyleKey::Position, StyleValue::Text("static".into()));
        cache.capture(StyleKey::StackOrder, StyleValue::Text("auto".into()));

        let mut restored = Vec::new();
        cache.restore_into(|key, value| restored.push((key, value)));

        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].0, StyleKey::StackOrder);
        assert!(cache.is_empty());
    }

    #[test]
    fn derived_sizes_are_not_part_of_the_restored_presentation() {
        let mut cache = StyleCache::new();
        cache.capture(StyleKey::StackOrder, StyleValue::Text("auto".into()));
        cache.set_number(StyleKey::BackgroundWidth, 512.0);
        cache.set_number(StyleKey::BackgroundHeight, 256.0);

        cache.evict(StyleKey::BackgroundWidth);
        cache.evict(StyleKey::BackgroundHeight);
        let mut restored = Vec::new();
        cache.restore_into(|key, value| restored.push((key, value)));

        assert_eq!(
            restored,
            vec![(StyleKey::StackOrder, StyleValue::Text("auto".into()))]
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn numbers_and_text_do_not_mix() {
        let mut cache = StyleCache::new();
        cache.set(StyleKey::StackOrder, StyleValue::Text("auto".into()));
        assert_eq!(cache.get_number(StyleKey::StackOrder), None);
    }
}
