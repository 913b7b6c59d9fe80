// ============================================================================
// skywatch-core/src/detection/cache.rs
// ============================================================================
//
// DETECTION CACHE
//
// Holds the detections from the most recently inferred frame so that skipped
// frames can redraw them. One slot, owned by the run; an update swaps the
// shared slice, so readers holding the previous set are unaffected.

use super::Detection;

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DetectionCache {
    current: Arc<[Detection]>,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self {
            current: Arc::from(Vec::new()),
        }
    }

    /// Replaces the held detections.
    pub fn update(&mut self, detections: Vec<Detection>) {
        self.current = Arc::from(detections);
    }

    /// The most recent detections; empty before the first update.
    pub fn read(&self) -> Arc<[Detection]> {
        Arc::clone(&self.current)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new()
    }
}
