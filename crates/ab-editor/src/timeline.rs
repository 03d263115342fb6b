//! Keyframe recording for animation authoring.
//!
//! When a manipulation ends while authoring, every property touched during
//! the gesture gets a keyframe at the current timeline time — but only into
//! tracks that already exist, and never twice at the same time (releasing
//! without moving does not duplicate keyframes). Track creation is a host
//! concern.

use ab_core::id::ElementId;
use ab_core::patch::PropertyKey;
use std::collections::HashMap;

/// Two keyframe times closer than this are the same keyframe.
const TIME_EPSILON: f32 = 1e-3;

#[derive(Debug, Default)]
pub struct Timeline {
    /// Current playhead time, seconds.
    pub time: f32,
    tracks: HashMap<(ElementId, PropertyKey), Vec<f32>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty track if one does not exist.
    pub fn ensure_track(&mut self, id: ElementId, key: PropertyKey) {
        self.tracks.entry((id, key)).or_default();
    }

    pub fn has_track(&self, id: ElementId, key: PropertyKey) -> bool {
        self.tracks.contains_key(&(id, key))
    }

    /// Keyframe times for a track, sorted ascending. Empty if no track.
    pub fn keyframes(&self, id: ElementId, key: PropertyKey) -> &[f32] {
        self.tracks
            .get(&(id, key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record a keyframe at the current time. Returns true if one was
    /// added; false when there is no track or a keyframe already sits at
    /// this time.
    pub fn record(&mut self, id: ElementId, key: PropertyKey) -> bool {
        let time = self.time;
        let Some(times) = self.tracks.get_mut(&(id, key)) else {
            return false;
        };
        if times.iter().any(|t| (t - time).abs() < TIME_EPSILON) {
            return false;
        }
        let pos = times.partition_point(|t| *t < time);
        times.insert(pos, time);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_requires_existing_track() {
        let mut tl = Timeline::new();
        let id = ElementId::intern("tl_a");
        assert!(!tl.record(id, PropertyKey::X));

        tl.ensure_track(id, PropertyKey::X);
        assert!(tl.record(id, PropertyKey::X));
        assert_eq!(tl.keyframes(id, PropertyKey::X), &[0.0]);
    }

    #[test]
    fn record_is_idempotent_at_a_time() {
        let mut tl = Timeline::new();
        let id = ElementId::intern("tl_b");
        tl.ensure_track(id, PropertyKey::Y);
        tl.time = 1.5;
        assert!(tl.record(id, PropertyKey::Y));
        assert!(!tl.record(id, PropertyKey::Y));
        assert_eq!(tl.keyframes(id, PropertyKey::Y).len(), 1);
    }

    #[test]
    fn keyframes_stay_sorted() {
        let mut tl = Timeline::new();
        let id = ElementId::intern("tl_c");
        tl.ensure_track(id, PropertyKey::Rotation);
        tl.time = 2.0;
        tl.record(id, PropertyKey::Rotation);
        tl.time = 0.5;
        tl.record(id, PropertyKey::Rotation);
        assert_eq!(tl.keyframes(id, PropertyKey::Rotation), &[0.5, 2.0]);
    }
}
